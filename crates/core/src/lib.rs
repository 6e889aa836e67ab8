pub mod config;
pub mod domain;
pub mod errors;
pub mod market;
pub mod normalize;

pub use domain::matching::{ExactMatchSet, PlatformFailure, PlatformMatch, SimilarProductSet};
pub use domain::platform::Platform;
pub use domain::pricing::{BrandTier, PriceBreakdown, PriceSuggestion, SuggestedPrice};
pub use domain::product::{CatalogRecord, ProductSpec};
pub use domain::report::{
    ExistenceCheck, ListedPrice, PriceQueryReport, QueryWarning, WarningKind,
};
pub use errors::{
    ApplicationError, CatalogError, DomainError, ExternalServiceError, InterfaceError,
};
pub use market::catalog::{CatalogAccessor, CatalogFilter, InMemoryCatalog, ProcessorPredicate};
pub use market::existence::{ExistenceOracle, ExistenceQuery, SearchHit, UnconfiguredOracle};
pub use market::filters::{enumerate_filters, FilterOptions, FilterSelection};
pub use market::pricing::{PricingEngine, PricingTables, TieredPricingEngine};
pub use market::suggestion::{
    parse_suggestion_reply, SuggestedListing, SuggestionAdvice, SuggestionAdvisor,
    SuggestionRequest, SuggestionTextGenerator, UnconfiguredGenerator,
};
pub use market::PriceQueryRuntime;
