// document fields
pub const DOC_ID: &str = "_id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const PROTECTED_FIELDS: [&str; 2] = [DOC_ID, CREATED_AT];
pub const FIELD_SEPARATOR: &str = ".";

// collections used by the domain convenience methods
pub const METRICS_COLLECTION: &str = "metrics";
pub const INSIGHTS_COLLECTION: &str = "insights";
pub const COMPANIES_COLLECTION: &str = "companies";
pub const STORIES_COLLECTION: &str = "stories";
pub const TRENDS_COLLECTION: &str = "trends";
pub const PROJECTS_COLLECTION: &str = "projects";
pub const FUNDS_COLLECTION: &str = "funds";

pub const DEFAULT_COLLECTIONS: [&str; 7] = [
    METRICS_COLLECTION,
    INSIGHTS_COLLECTION,
    COMPANIES_COLLECTION,
    STORIES_COLLECTION,
    TRENDS_COLLECTION,
    PROJECTS_COLLECTION,
    FUNDS_COLLECTION,
];

// connection defaults
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_MONGODB_DATABASE: &str = "trendsense";
pub const DEFAULT_MAX_POOL_SIZE: u32 = 50;
pub const DEFAULT_SERVER_SELECTION_TIMEOUT_SECS: u64 = 5;
pub const MONGODB_DUPLICATE_KEY_CODE: i32 = 11000;

// environment variables
pub const ENV_DATABASE_ADAPTER: &str = "DATABASE_ADAPTER";
pub const ENV_PRIMARY_DATABASE_ADAPTER: &str = "PRIMARY_DATABASE_ADAPTER";
pub const ENV_SECONDARY_DATABASE_ADAPTER: &str = "SECONDARY_DATABASE_ADAPTER";
pub const ENV_MONGODB_URI: &str = "MONGODB_URI";
pub const ENV_MONGODB_DB: &str = "MONGODB_DB";
pub const ENV_MONGODB_USERNAME: &str = "MONGODB_USERNAME";
pub const ENV_MONGODB_PASSWORD: &str = "MONGODB_PASSWORD";
pub const ENV_MONGODB_MAX_POOL_SIZE: &str = "MONGODB_MAX_POOL_SIZE";
pub const ENV_FIREBASE_CREDENTIALS_PATH: &str = "FIREBASE_CREDENTIALS_PATH";
pub const ENV_FIREBASE_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
