pub mod auth;
pub mod catalog;
pub mod config;
pub mod location;
pub mod metrics;
pub mod search;
pub mod stats;
pub mod testing;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
};
pub use catalog::{
    CatalogError, EntityKind, FacetKind, Game, GameCatalog, GameDetail, GameUpdate, Location,
    LocationPathEntry, NamedEntity, NewGame, SqliteCatalog, TitleKey,
};
pub use config::{
    config_path_from_env, load_config, load_config_from_str, validate_config, AuthMethod, Config,
    ConfigError, SanitizedConfig,
};
pub use location::{DeleteOutcome, LocationError, LocationStore, LocationTree};
pub use search::{
    suggestion_query, FacetFilter, GameFilter, GameSearch, MatchMode, SearchError, SuggestKind,
    Suggestions,
};
pub use stats::{
    HealthMetric, HealthStats, OverviewStats, StatsAggregator, StatsCache, StatsError,
    StatsSource,
};
