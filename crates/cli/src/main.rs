use std::process::ExitCode;

fn main() -> ExitCode {
    spi_cli::run()
}
