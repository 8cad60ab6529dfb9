use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use employee_management_backend::security::{self, AccessPolicy, CsrfProtection, FilterChain, XSRF_COOKIE, XSRF_HEADER};
use employee_management_backend::startup::{self, AppState};
use employee_management_backend::store::{MemoryStore, Store};
use employee_management_backend::utils::jwt;

const SECRET: &str = "integration-secret";

fn state() -> (Arc<MemoryStore>, web::Data<AppState>) {
    let store = Arc::new(MemoryStore::new());
    let state = web::Data::new(AppState::new(store.clone(), Some(SECRET.to_string())));
    (store, state)
}

macro_rules! app {
    ($state:expr, $chain:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .app_data(web::Data::new($chain))
                .wrap(from_fn(security::gate))
                .configure(startup::configure),
        )
        .await
    };
}

fn employee_body(department: Value) -> Value {
    json!({
        "firstName": "John",
        "lastName": "Doe",
        "email": "john.doe@example.com",
        "age": 30,
        "salary": 50000,
        "department": department,
    })
}

#[actix_web::test]
async fn department_crud_round_trip() {
    let (_store, state) = state();
    let app = app!(state, FilterChain::permit_all());

    let req = test::TestRequest::post()
        .uri("/api/departments")
        .set_json(json!({ "name": "Engineering" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_i64().expect("generated id");
    assert_eq!(created["name"], "Engineering");
    assert_eq!(created["employees"], json!([]));

    let req = test::TestRequest::get().uri(&format!("/api/departments/{}", id)).to_request();
    let loaded: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(loaded["name"], "Engineering");

    let req = test::TestRequest::put()
        .uri(&format!("/api/departments/{}", id))
        .set_json(json!({ "name": "Platform" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["id"], id);
    assert_eq!(updated["name"], "Platform");

    let req = test::TestRequest::post()
        .uri("/api/departments")
        .set_json(json!({ "name": "Platform" }))
        .to_request();
    let duplicate: Value = test::call_and_read_body_json(&app, req).await;
    assert_ne!(duplicate["id"], id);

    let req = test::TestRequest::get().uri("/api/departments").to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let req = test::TestRequest::delete().uri(&format!("/api/departments/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri(&format!("/api/departments/{}", id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("not found"));
}

#[actix_web::test]
async fn department_name_is_not_validated() {
    let (_store, state) = state();
    let app = app!(state, FilterChain::permit_all());

    for body in [json!({ "name": "" }), json!({})] {
        let req = test::TestRequest::post().uri("/api/departments").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["name"], "");
    }
}

#[actix_web::test]
async fn department_lists_each_employee_once_without_back_reference() {
    let (store, state) = state();
    let department = store.insert_department("Support").await.unwrap();
    let app = app!(state, FilterChain::permit_all());

    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/employees")
            .set_json(employee_body(json!({ "id": department.id })))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get().uri(&format!("/api/departments/{}", department.id)).to_request();
    let view: Value = test::call_and_read_body_json(&app, req).await;
    let employees = view["employees"].as_array().unwrap();
    assert_eq!(employees.len(), 3);
    for employee in employees {
        assert!(employee.get("department").is_none());
        assert!(employee.get("departmentId").is_none());
        assert_eq!(employee["firstName"], "John");
    }

    let req = test::TestRequest::get().uri("/api/departments").to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all[0]["employees"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn deleting_department_cascades_through_the_api() {
    let (store, state) = state();
    let doomed = store.insert_department("Doomed").await.unwrap();
    let kept = store.insert_department("Kept").await.unwrap();
    let app = app!(state, FilterChain::permit_all());

    let mut doomed_ids = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/employees")
            .set_json(employee_body(json!({ "id": doomed.id })))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        doomed_ids.push(created["id"].as_i64().unwrap());
    }
    let req = test::TestRequest::post()
        .uri("/api/employees")
        .set_json(employee_body(json!({ "id": kept.id })))
        .to_request();
    let survivor: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::delete().uri(&format!("/api/departments/{}", doomed.id)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["employeesRemoved"], 2);

    for id in doomed_ids {
        let req = test::TestRequest::get().uri(&format!("/api/employees/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    let req = test::TestRequest::get().uri("/api/employees").to_request();
    let remaining: Value = test::call_and_read_body_json(&app, req).await;
    let remaining = remaining.as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"], survivor["id"]);
    assert_eq!(remaining[0]["departmentId"], kept.id);
}

#[actix_web::test]
async fn employee_crud_accepts_ui_payloads() {
    let (store, state) = state();
    let sales = store.insert_department("Sales").await.unwrap();
    let ops = store.insert_department("Ops").await.unwrap();
    let app = app!(state, FilterChain::permit_all());

    // The UI posts the selected department id as a string.
    let req = test::TestRequest::post()
        .uri("/api/employees")
        .set_json(employee_body(json!({ "id": sales.id.to_string() })))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["departmentId"], sales.id);
    assert_eq!(created["lastName"], "Doe");

    let req = test::TestRequest::put()
        .uri(&format!("/api/employees/{}", id))
        .set_json(json!({
            "firstName": "Jane",
            "lastName": "Roe",
            "email": "jane@example.com",
            "age": 41,
            "salary": 72000.5,
            "departmentId": ops.id,
        }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["firstName"], "Jane");
    assert_eq!(updated["salary"], 72000.5);
    assert_eq!(updated["departmentId"], ops.id);

    let req = test::TestRequest::get().uri(&format!("/api/employees?departmentId={}", sales.id)).to_request();
    let in_sales: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(in_sales, json!([]));

    let req = test::TestRequest::get().uri(&format!("/api/employees?departmentId={}", ops.id)).to_request();
    let in_ops: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(in_ops.as_array().unwrap().len(), 1);

    let req = test::TestRequest::delete().uri(&format!("/api/employees/{}", id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete().uri(&format!("/api/employees/{}", id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn employee_without_department_is_allowed() {
    let (_store, state) = state();
    let app = app!(state, FilterChain::permit_all());

    let req = test::TestRequest::post()
        .uri("/api/employees")
        .set_json(employee_body(json!({ "id": "" })))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["departmentId"], Value::Null);
}

#[actix_web::test]
async fn bad_employee_input_is_rejected() {
    let (_store, state) = state();
    let app = app!(state, FilterChain::permit_all());

    let req = test::TestRequest::post()
        .uri("/api/employees")
        .set_json(employee_body(json!({ "id": 404 })))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Department 404 does not exist");

    let mut invalid_email = employee_body(Value::Null);
    invalid_email["email"] = json!("not-an-email");
    let req = test::TestRequest::post().uri("/api/employees").set_json(invalid_email).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let mut negative_salary = employee_body(Value::Null);
    negative_salary["salary"] = json!(-1);
    let req = test::TestRequest::post().uri("/api/employees").set_json(negative_salary).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/employees")
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].is_string());

    let req = test::TestRequest::get().uri("/api/employees/abc").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri("/api/employees/999")
        .set_json(employee_body(Value::Null))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn default_chain_never_answers_forbidden() {
    let (store, state) = state();
    let department = store.insert_department("Open").await.unwrap();
    let app = app!(state, FilterChain::permit_all());

    let requests = vec![
        test::TestRequest::get().uri("/api/departments"),
        test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("Authorization", "Bearer not-a-real-token")),
        test::TestRequest::post()
            .uri("/api/departments")
            .set_json(json!({ "name": "No CSRF token" })),
        test::TestRequest::put()
            .uri(&format!("/api/departments/{}", department.id))
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .set_json(json!({ "name": "Renamed" })),
        test::TestRequest::delete().uri("/api/employees/12345"),
        test::TestRequest::get().uri("/verify-username/nobody"),
        test::TestRequest::get().uri("/no/such/route"),
    ];

    for req in requests {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_ne!(resp.status(), StatusCode::FORBIDDEN);
        assert_ne!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

#[actix_web::test]
async fn account_lifecycle() {
    let (store, state) = state();
    let app = app!(state, FilterChain::permit_all());
    let credentials = json!({ "username": "alice", "password": "correct-horse" });

    let req = test::TestRequest::post().uri("/register").set_json(&credentials).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let stored = store.find_user("alice").await.unwrap().unwrap();
    assert_ne!(stored.password, "correct-horse");
    assert!(stored.password.starts_with("$argon2"));

    let req = test::TestRequest::post().uri("/register").set_json(&credentials).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({ "username": "bob", "password": "short" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post().uri("/authenticate").set_json(&credentials).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let claims = jwt::validate_token(body["token"].as_str().unwrap(), SECRET).unwrap();
    assert_eq!(claims.sub, "alice");

    let req = test::TestRequest::post()
        .uri("/authenticate")
        .set_json(json!({ "username": "alice", "password": "wrong-password" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/verify-username/alice").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::get().uri("/verify-username/mallory").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/reset-password")
        .set_json(json!({ "username": "alice", "newPassword": "battery-staple" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post().uri("/authenticate").set_json(&credentials).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/authenticate")
        .set_json(json!({ "username": "alice", "password": "battery-staple" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/reset-password")
        .set_json(json!({ "username": "mallory", "newPassword": "battery-staple" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn authenticate_without_secret_is_a_server_error() {
    let store = Arc::new(MemoryStore::new());
    let state = web::Data::new(AppState::new(store, None));
    let app = app!(state, FilterChain::permit_all());

    let req = test::TestRequest::post()
        .uri("/authenticate")
        .set_json(json!({ "username": "alice", "password": "whatever1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn authenticated_policy_guards_the_api() {
    let (_store, state) = state();
    let chain = FilterChain::new(CsrfProtection::Disabled, AccessPolicy::Authenticated, Some(SECRET.to_string()));
    let app = app!(state, chain);

    let req = test::TestRequest::get().uri("/api/departments").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Missing token");

    let credentials = json!({ "username": "carol", "password": "open-sesame" });
    let req = test::TestRequest::post().uri("/register").set_json(&credentials).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    let req = test::TestRequest::post().uri("/authenticate").set_json(&credentials).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/departments")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn double_submit_csrf_blocks_unsafe_requests_without_token() {
    let (_store, state) = state();
    let chain = FilterChain::new(CsrfProtection::DoubleSubmitCookie, AccessPolicy::PermitAll, None);
    let app = app!(state, chain);

    let req = test::TestRequest::post()
        .uri("/api/departments")
        .set_json(json!({ "name": "Blocked" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/departments")
        .cookie(Cookie::new(XSRF_COOKIE, "t0k3n"))
        .insert_header((XSRF_HEADER, "t0k3n"))
        .set_json(json!({ "name": "Allowed" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/api/departments").to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn current_user_is_resolved_from_bearer_token() {
    let (store, state) = state();
    let app = app!(state, FilterChain::permit_all());
    let credentials = json!({ "username": "dave", "password": "profile-page" });

    let req = test::TestRequest::post().uri("/register").set_json(&credentials).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    let req = test::TestRequest::post().uri("/authenticate").set_json(&credentials).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me, json!({ "username": "dave" }));

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", "Bearer not-a-real-token"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    // Signed token for an account that was never registered.
    let ghost = jwt::generate_token("ghost", SECRET).unwrap();
    assert!(store.find_user("ghost").await.unwrap().is_none());
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", ghost)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn empty_department_filter_lists_everyone() {
    let (store, state) = state();
    let department = store.insert_department("Filtered").await.unwrap();
    let app = app!(state, FilterChain::permit_all());

    for department_ref in [json!({ "id": department.id }), json!({ "id": "" })] {
        let req = test::TestRequest::post()
            .uri("/api/employees")
            .set_json(employee_body(department_ref))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get().uri("/api/employees?departmentId=").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let all: Value = test::read_body_json(resp).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let req = test::TestRequest::get().uri("/api/employees?departmentId=sales").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn renaming_with_empty_body_clears_name_and_keeps_employees() {
    let (store, state) = state();
    let department = store.insert_department("Named").await.unwrap();
    let app = app!(state, FilterChain::permit_all());

    let req = test::TestRequest::post()
        .uri("/api/employees")
        .set_json(employee_body(json!({ "id": department.id })))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::put()
        .uri(&format!("/api/departments/{}", department.id))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["name"], "");
    assert_eq!(updated["employees"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn gate_without_registered_chain_permits_requests() {
    let (_store, state) = state();
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .wrap(from_fn(security::gate))
            .configure(startup::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/departments")
        .set_json(json!({ "name": "Unguarded" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
}
