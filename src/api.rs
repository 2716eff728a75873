use crate::advisor::Advisor;
use crate::classifier::QueryType;
use crate::error::SearchError;
use crate::reply::ERROR_TEXT;
use crate::store::FacilityRecord;
use crate::vocab::FacilityKind;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;

// --- Wire types ---

#[derive(Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub user_id: String,
    pub response: String,
    pub query_type: String,
}

#[derive(Deserialize)]
pub struct FacilitiesQuery {
    pub neighborhood: String,
    #[serde(rename = "type")]
    pub facility_type: Option<String>,
}

#[derive(Serialize)]
struct FacilitiesResponse {
    neighborhood: String,
    facilities: Vec<FacilityRecord>,
}

// --- Endpoints ---

#[post("/ask")]
async fn ask_endpoint(req: web::Json<AskRequest>, data: web::Data<Advisor>) -> impl Responder {
    let AskRequest { user_id, message } = req.into_inner();
    let user_id = user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let advisor = data.into_inner();
    let id = user_id.clone();
    let result = tokio::task::spawn_blocking(move || advisor.handle(&id, &message)).await;
    match result {
        Ok(reply) => HttpResponse::Ok().json(AskResponse {
            user_id,
            query_type: reply.query_type().label().to_string(),
            response: reply.text,
        }),
        Err(err) => {
            log::error!("advisor task failed: {}", err);
            HttpResponse::InternalServerError().json(AskResponse {
                user_id,
                response: ERROR_TEXT.to_string(),
                query_type: QueryType::Unknown.label().to_string(),
            })
        }
    }
}

#[get("/neighborhoods")]
async fn neighborhoods_endpoint(data: web::Data<Advisor>) -> impl Responder {
    let advisor = data.into_inner();
    match tokio::task::spawn_blocking(move || advisor.engine().known_neighborhoods()).await {
        Ok(names) => HttpResponse::Ok().json(json!({ "neighborhoods": names })),
        Err(err) => {
            log::error!("listing neighborhoods failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/facilities")]
async fn facilities_endpoint(
    query: web::Query<FacilitiesQuery>,
    data: web::Data<Advisor>,
) -> impl Responder {
    let FacilitiesQuery {
        neighborhood,
        facility_type,
    } = query.into_inner();
    let kind = match facility_type.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(raw) => match FacilityKind::parse(raw) {
            Some(kind) => Some(kind),
            None => {
                return HttpResponse::BadRequest()
                    .json(json!({ "error": format!("unknown facility type {}", raw) }))
            }
        },
        None => None,
    };

    let advisor = data.into_inner();
    let name = neighborhood.clone();
    let result = tokio::task::spawn_blocking(move || advisor.search().find(&name, kind)).await;
    match result {
        Ok(Ok(facilities)) => HttpResponse::Ok().json(FacilitiesResponse {
            neighborhood,
            facilities,
        }),
        Ok(Err(err @ SearchError::NoNeighborhoodColumn { .. })) => {
            HttpResponse::UnprocessableEntity().json(json!({ "error": err.to_string() }))
        }
        Ok(Err(err)) => {
            log::warn!("facility lookup failed: {}", err);
            HttpResponse::ServiceUnavailable().json(json!({ "error": err.to_string() }))
        }
        Err(err) => {
            log::error!("facility task failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/health")]
async fn health_endpoint() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(ask_endpoint)
        .service(neighborhoods_endpoint)
        .service(facilities_endpoint)
        .service(health_endpoint);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EngineSettings;
    use crate::store::DataStore;
    use actix_web::{http::StatusCode, test, App};
    use std::collections::HashMap;

    fn advisor() -> web::Data<Advisor> {
        let neighborhoods = vec![serde_json::from_value(json!({"name": "حي النرجس"})).unwrap()];
        let mut facilities = HashMap::new();
        facilities.insert(
            FacilityKind::School,
            vec![json!({"الاسم": "مدرسة النور", "الحي": "النرجس"})
                .as_object()
                .cloned()
                .unwrap()],
        );
        facilities.insert(
            FacilityKind::Park,
            vec![json!({"الاسم": "حديقة الملك"}).as_object().cloned().unwrap()],
        );
        let store = DataStore::new(neighborhoods, Vec::new(), facilities);
        web::Data::new(Advisor::with_store(store, &EngineSettings::default()))
    }

    #[actix_web::test]
    async fn ask_issues_a_user_id() {
        let app = test::init_service(App::new().app_data(advisor()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/ask")
            .set_json(json!({ "message": "اين توجد مدرسة النور" }))
            .to_request();
        let resp: AskResponse = test::call_and_read_body_json(&app, req).await;
        assert!(uuid::Uuid::parse_str(&resp.user_id).is_ok());
        assert_eq!(resp.query_type, "facility_location");
        assert!(resp.response.contains("مدرسة النور"));
    }

    #[actix_web::test]
    async fn ask_keeps_a_given_user_id() {
        let app = test::init_service(App::new().app_data(advisor()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/ask")
            .set_json(json!({ "user_id": "u-1", "message": "" }))
            .to_request();
        let resp: AskResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.user_id, "u-1");
        assert_eq!(resp.query_type, "unknown");
        assert_eq!(resp.response, crate::reply::EMPTY_PROMPT);
    }

    #[actix_web::test]
    async fn lists_neighborhoods() {
        let app = test::init_service(App::new().app_data(advisor()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/neighborhoods").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["neighborhoods"], json!(["النرجس"]));
    }

    #[actix_web::test]
    async fn facilities_by_neighborhood_and_type() {
        let app = test::init_service(App::new().app_data(advisor()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/facilities?neighborhood=%D8%A7%D9%84%D9%86%D8%B1%D8%AC%D8%B3&type=schools")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["facilities"][0]["name"], "مدرسة النور");
    }

    #[actix_web::test]
    async fn facility_errors_map_to_statuses() {
        let app = test::init_service(App::new().app_data(advisor()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/facilities?neighborhood=x&type=zoo")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/facilities?neighborhood=x&type=parks")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn health() {
        let app = test::init_service(App::new().app_data(advisor()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
