/// Catalog location and crawl defaults
pub const BASE_URL: &str = "https://fashion-studio.dicoding.dev";
pub const DEFAULT_MAX_PAGES: u32 = 50;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1000;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// $1 = Rp16.000
pub const DEFAULT_EXCHANGE_RATE: f64 = 16000.0;

// Placeholders written by the crawler when a field is missing from the card
pub const UNKNOWN_TITLE: &str = "Unknown Product";
pub const PRICE_UNAVAILABLE: &str = "Price Unavailable";
pub const INVALID_RATING: &str = "Invalid Rating";
pub const UNKNOWN_FIELD: &str = "Unknown";

// Column names shared by the raw snapshot, the flat file and the spreadsheet
pub const COL_TITLE: &str = "Title";
pub const COL_PRICE: &str = "Price";
pub const COL_RATING: &str = "Rating";
pub const COL_COLORS: &str = "Colors";
pub const COL_SIZE: &str = "Size";
pub const COL_GENDER: &str = "Gender";
pub const COL_TIMESTAMP: &str = "timestamp";

/// Columns the normalizer refuses to run without, in the order they are checked
pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_TITLE, COL_PRICE, COL_RATING, COL_COLORS, COL_SIZE, COL_GENDER,
];

/// Header row of every normalized table
pub const OUTPUT_COLUMNS: [&str; 7] = [
    COL_TITLE,
    COL_PRICE,
    COL_RATING,
    COL_COLORS,
    COL_SIZE,
    COL_GENDER,
    COL_TIMESTAMP,
];

pub const SIZE_PREFIX: &str = "Size:";
pub const GENDER_PREFIX: &str = "Gender:";

/// Format used by the database sink for rows captured without a timestamp
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
