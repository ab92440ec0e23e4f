// Default values - these are the single source of truth for defaults
pub const BRAND_NAME: &str = "JiLang Agent";
pub const DEFAULT_API_BASE_URL: &str = "/api";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u32 = 30_000;
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u32 = 60_000;

// List paging
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

// Notification queue
pub const DEFAULT_MAX_NOTIFICATIONS: usize = 5;
pub const NOTIFICATION_ANIMATION_MS: u64 = 300;
pub const SUCCESS_DURATION_MS: u64 = 4000;
pub const ERROR_DURATION_MS: u64 = 6000;
pub const WARNING_DURATION_MS: u64 = 5000;
pub const INFO_DURATION_MS: u64 = 4000;

// Global spinner stays at 100% this long before disappearing
pub const LOADING_HIDE_DELAY_MS: u64 = 300;
pub const DEFAULT_LOADING_MESSAGE: &str = "加载中...";

// How often the browser build drives the virtual-time stores
pub const TICK_INTERVAL_MS: u32 = 100;

// Persisted keys (all values are JSON strings except the raw token)
pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const SETTINGS_KEY: &str = "settings";
pub const LEGACY_SYSTEM_SETTINGS_KEY: &str = "systemSettings";
pub const LEGACY_NOTIFICATION_SETTINGS_KEY: &str = "notificationSettings";
pub const THEME_MODE_KEY: &str = "themeMode";
pub const THEME_COLOR_KEY: &str = "themeColor";

// Image compression defaults
pub const DEFAULT_IMAGE_MAX_WIDTH: u32 = 800;
pub const DEFAULT_IMAGE_MAX_HEIGHT: u32 = 800;
pub const DEFAULT_IMAGE_QUALITY: f64 = 0.8;
