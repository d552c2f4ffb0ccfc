use actix_web::{delete, get, post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::auth::Actor;
use crate::error::LedgerError;
use crate::ledger::{ExpenseRequest, Ledger, NewGroup};
use crate::validation::SettlementDraft;

type Response = Result<HttpResponse, LedgerError>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberEmailsJson {
    member_emails: Vec<String>,
}

#[get("/health")]
async fn health(ledger: web::Data<Ledger>) -> Response {
    ledger.health().await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

#[get("/groups")]
async fn list_groups(ledger: web::Data<Ledger>, Actor(actor): Actor) -> Response {
    let groups = ledger.list_groups(&actor).await?;
    Ok(HttpResponse::Ok().json(groups))
}

#[post("/groups")]
async fn create_group(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    json: web::Json<NewGroup>,
) -> Response {
    let group = ledger.create_group(&actor, json.into_inner()).await?;
    Ok(HttpResponse::Created().json(group))
}

#[delete("/groups/{id}")]
async fn delete_group(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
) -> Response {
    ledger.delete_group(&actor, &id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Group deleted" })))
}

#[post("/groups/{id}/members")]
async fn add_members(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
    json: web::Json<MemberEmailsJson>,
) -> Response {
    let group = ledger
        .add_members(&actor, &id.into_inner(), &json.into_inner().member_emails)
        .await?;
    Ok(HttpResponse::Ok().json(group))
}

#[delete("/groups/{id}/members/{member_id}")]
async fn remove_member(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    path: web::Path<(String, String)>,
) -> Response {
    let (id, member_id) = path.into_inner();
    let group = ledger.remove_member(&actor, &id, &member_id).await?;
    Ok(HttpResponse::Ok().json(group))
}

#[get("/groups/{id}/expenses")]
async fn list_expenses(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
) -> Response {
    let expenses = ledger.expenses(&actor, &id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(expenses))
}

#[post("/groups/{id}/expenses")]
async fn add_expense(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
    expense: web::Json<ExpenseRequest>,
) -> Response {
    let expense = ledger
        .record_expense(&actor, &id.into_inner(), expense.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(expense))
}

#[get("/groups/{id}/settlements")]
async fn list_settlements(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
) -> Response {
    let settlements = ledger.settlements(&actor, &id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(settlements))
}

#[post("/groups/{id}/settlements")]
async fn add_settlement(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
    settlement: web::Json<SettlementDraft>,
) -> Response {
    let settlement = ledger
        .record_settlement(&actor, &id.into_inner(), settlement.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(settlement))
}

#[get("/groups/{id}/balances")]
async fn get_balances(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
) -> Response {
    let balances = ledger.balances(&actor, &id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(balances))
}

#[get("/groups/{id}/suggestions")]
async fn get_suggestions(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
) -> Response {
    let suggestions = ledger.suggestions(&actor, &id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(suggestions))
}

#[get("/groups/{id}/exchanges")]
async fn get_exchanges(
    ledger: web::Data<Ledger>,
    Actor(actor): Actor,
    id: web::Path<String>,
) -> Response {
    let exchanges = ledger.exchanges(&actor, &id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(exchanges))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health)
            .service(list_groups)
            .service(create_group)
            .service(delete_group)
            .service(add_members)
            .service(remove_member)
            .service(list_expenses)
            .service(add_expense)
            .service(list_settlements)
            .service(add_settlement)
            .service(get_balances)
            .service(get_suggestions)
            .service(get_exchanges),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenKey;
    use crate::schemas::Member;
    use crate::store::MemoryStore;
    use actix_web::{http::StatusCode, test, App};
    use std::collections::HashMap;
    use std::sync::Arc;

    const SECRET: &str = "test-secret";

    async fn store_with(members: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for id in members {
            store
                .insert_member(Member {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    email: format!("{}@example.com", id),
                })
                .await;
        }
        store
    }

    fn bearer(member: &str) -> (&'static str, String) {
        let token = TokenKey::new(SECRET).issue(member).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }

    macro_rules! app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Ledger::new($store.clone())))
                    .app_data(web::Data::new(TokenKey::new(SECRET)))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_needs_no_token() {
        let store = store_with(&[]).await;
        let app = app!(store);
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn requests_without_token_are_rejected() {
        let store = store_with(&["a"]).await;
        let app = app!(store);
        let req = test::TestRequest::get().uri("/api/groups").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn expense_and_settlement_flow() {
        let store = store_with(&["a", "b"]).await;
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/api/groups")
            .insert_header(bearer("a"))
            .set_json(json!({ "name": "Dinner club", "memberEmails": ["b@example.com"] }))
            .to_request();
        let group: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let group_id = group["id"].as_str().unwrap().to_string();
        assert_eq!(group["createdBy"], "a");
        assert_eq!(group["memberDetails"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::post()
            .uri(&format!("/api/groups/{}/expenses", group_id))
            .insert_header(bearer("a"))
            .set_json(json!({
                "description": "Dinner",
                "amount": "40.00",
                "category": "Food",
                "split": { "exact": [
                    { "memberId": "a", "amount": "20.00" },
                    { "memberId": "b", "amount": "20.00" }
                ] }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri(&format!("/api/groups/{}/balances", group_id))
            .insert_header(bearer("b"))
            .to_request();
        let balances: HashMap<String, String> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(balances["a"], "20.00");
        assert_eq!(balances["b"], "-20.00");

        let req = test::TestRequest::get()
            .uri(&format!("/api/groups/{}/suggestions", group_id))
            .insert_header(bearer("b"))
            .to_request();
        let suggestions: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(suggestions[0]["payee"], "a");
        assert_eq!(suggestions[0]["amount"], "20.00");
        assert_eq!(suggestions[0]["reason"], "you owe A");

        let req = test::TestRequest::post()
            .uri(&format!("/api/groups/{}/settlements", group_id))
            .insert_header(bearer("b"))
            .set_json(json!({ "to": "a", "amount": 20 }))
            .to_request();
        let settlement: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(settlement["from"], "b");
        assert_eq!(settlement["description"], "Settlement payment");

        let req = test::TestRequest::get()
            .uri(&format!("/api/groups/{}/exchanges", group_id))
            .insert_header(bearer("a"))
            .to_request();
        let exchanges: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert!(exchanges.is_empty());
    }

    #[actix_web::test]
    async fn validation_errors_are_bad_requests() {
        let store = store_with(&["a", "b"]).await;
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/api/groups")
            .insert_header(bearer("a"))
            .set_json(json!({ "name": "Flat", "memberEmails": ["b@example.com"] }))
            .to_request();
        let group: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let group_id = group["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/groups/{}/expenses", group_id))
            .insert_header(bearer("a"))
            .set_json(json!({
                "description": "Rent",
                "amount": 30,
                "split": { "exact": [
                    { "memberId": "a", "amount": 10 },
                    { "memberId": "b", "amount": 10 }
                ] }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "validation_error");

        let req = test::TestRequest::post()
            .uri(&format!("/api/groups/{}/settlements", group_id))
            .insert_header(bearer("a"))
            .set_json(json!({ "to": "a", "amount": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn only_the_creator_deletes_and_creator_stays() {
        let store = store_with(&["a", "b"]).await;
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/api/groups")
            .insert_header(bearer("a"))
            .set_json(json!({ "name": "Flat", "memberEmails": ["b@example.com"] }))
            .to_request();
        let group: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let group_id = group["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::delete()
            .uri(&format!("/api/groups/{}/members/a", group_id))
            .insert_header(bearer("b"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/groups/{}", group_id))
            .insert_header(bearer("b"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/groups/{}", group_id))
            .insert_header(bearer("a"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/groups/{}/balances", group_id))
            .insert_header(bearer("a"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
