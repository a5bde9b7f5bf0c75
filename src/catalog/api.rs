use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};

use crate::error::AppResult;

use super::{PlanCatalog, PlanRecord};

/// key: catalog-api -> plans offered by a service
pub async fn list_service_plans(
    Extension(catalog): Extension<Arc<PlanCatalog>>,
    Path(service_id): Path<i64>,
) -> AppResult<Json<Vec<PlanRecord>>> {
    let plans = catalog.plans_for_service(service_id).await?;
    Ok(Json(plans))
}
