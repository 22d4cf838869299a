pub const PAGE_SIZE: i64 = 6;
pub const PAGE_QUERY_PARAM: &str = "page";
pub const PAGE_SIZE_QUERY_PARAM: &str = "limit";

pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_COOKING_TIME: i64 = i16::MAX as i64;
pub const MIN_INGREDIENT_AMOUNT: i64 = 1;

pub const MAX_CHARFIELD_LENGTH: usize = 200;
pub const MAX_NAMES_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_PASSWORD_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound for JSON request bodies, base64 images included.
pub const MAX_BODY_SIZE: u64 = 20 * 1024 * 1024;

pub const MEDIA_URL: &str = "/media/";
pub const RECIPE_IMAGE_DIR: &str = "recipes";

pub const SHOPPING_LIST_FILENAME: &str = "shop_list.txt";
pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";

pub const INGREDIENT_IMPORT_BATCH: usize = 999;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];
