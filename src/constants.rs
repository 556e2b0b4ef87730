pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_UNIT_LENGTH: usize = 200;
pub const MAX_SLUG_LENGTH: usize = 50;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USER_FIELD_LENGTH: usize = 150;

pub const TAG_COLOR_PATTERN: &str = r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$";
pub const TAG_SLUG_PATTERN: &str = r"^[-a-zA-Z0-9_]+$";
pub const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
pub const RECIPE_IMAGE_DIR: &str = "recipes";

pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_MEDIA_URL: &str = "/media/";

/// Accepted spellings of boolean query parameters.
pub const BOOLEAN_VALUES: &[(&str, bool)] = &[
    ("1", true),
    ("true", true),
    ("True", true),
    ("0", false),
    ("false", false),
    ("False", false),
];
