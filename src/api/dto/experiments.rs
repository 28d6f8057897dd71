//! DTOs for A/B test endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{NewAbVariant, VariantPatch};

/// Request to start an A/B test on a link.
///
/// The first variant is treated as the control in reports.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExperimentRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 2, message = "At least two variants are required"), nested)]
    pub variants: Vec<VariantInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VariantInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(url(message = "Invalid URL format"))]
    pub url: String,

    #[validate(range(min = 1, max = 100))]
    pub weight: i32,
}

impl From<VariantInput> for NewAbVariant {
    fn from(input: VariantInput) -> Self {
        NewAbVariant {
            name: input.name,
            url: input.url,
            weight: input.weight,
        }
    }
}

/// Partial variant update. Omitted fields keep their value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVariantRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub url: Option<String>,

    #[validate(range(min = 1, max = 100))]
    pub weight: Option<i32>,
}

impl From<UpdateVariantRequest> for VariantPatch {
    fn from(req: UpdateVariantRequest) -> Self {
        VariantPatch {
            name: req.name,
            url: req.url,
            weight: req.weight,
        }
    }
}
