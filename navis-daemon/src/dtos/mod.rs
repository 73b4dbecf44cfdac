pub mod approval;
pub mod device;
pub mod pairing;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Invalid pairing token")]
    pub error: String,
}
