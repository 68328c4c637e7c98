use actix_web::{get, post, put, web, Responder};
use chrono::Local;
use sea_orm::{ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{self, Authority},
    consts,
    entity::{prelude::*, sea_orm_active_enums::RoleType, user},
    error::ApiError,
    pages::{created_json, ok_json},
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(register)
        .service(login)
        .service(whoami)
        .service(change_password);
}

#[derive(Debug, Serialize, Deserialize)]
struct Register {
    name: String,
    email: String,
    password: String,
    role: Option<RoleType>,
}

#[post("/register")]
async fn register(db: web::Data<DatabaseConnection>, payload: web::Json<Register>) -> Result<impl Responder, ApiError> {
    if payload.name.trim().len() < 2 {
        return Err(ApiError::Validation("name must be at least 2 characters".to_string()));
    }

    if !payload.email.contains('@') {
        return Err(ApiError::Validation("a valid email is required".to_string()));
    }

    if payload.password.len() < consts::MIN_PASSWORD_LEN {
        return Err(ApiError::Validation("password must be at least 6 characters long".to_string()));
    }

    let taken = User::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(db.get_ref()).await?;

    if taken.is_some() {
        return Err(ApiError::Conflict("email is already registered".to_string()));
    }

    let model = user::ActiveModel {
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        name: Set(payload.name.trim().to_string()),
        email: Set(payload.email.clone()),
        password: Set(auth::hash_password(&payload.password, &payload.email)),
        role: Set(payload.role.clone().unwrap_or(RoleType::Employee)),
        is_active: Set(true),
        ..Default::default()
    };

    let created = User::insert(model)
        .exec_with_returning(db.get_ref()).await?;

    Ok(created_json("user registered successfully", created))
}

#[derive(Debug, Serialize, Deserialize)]
struct Login {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginData {
    token: String,
    user: user::Model,
}

#[post("/login")]
async fn login(db: web::Data<DatabaseConnection>, authority: web::Data<Authority>, credentials: web::Json<Login>) -> Result<impl Responder, ApiError> {
    let hashed_password = auth::hash_password(&credentials.password, &credentials.email);

    let Some(user) = User::find()
        .filter(user::Column::Email.eq(&credentials.email))
        .filter(user::Column::Password.eq(hashed_password))
        .filter(user::Column::IsActive.eq(true))
        .one(db.get_ref()).await?
    else {
        return Err(ApiError::Forbidden);
    };

    let token = authority.issue_for(&user);

    Ok(ok_json("login successful", LoginData { token, user }))
}

#[get("")]
async fn whoami(user: user::Model) -> impl Responder {
    ok_json("profile retrieved successfully", user)
}

#[derive(Debug, Serialize, Deserialize)]
struct ChangePassword {
    current_password: String,
    new_password: String,
}

#[put("/change-password")]
async fn change_password(db: web::Data<DatabaseConnection>, user: user::Model, payload: web::Json<ChangePassword>) -> Result<impl Responder, ApiError> {
    if payload.new_password.len() < consts::MIN_PASSWORD_LEN {
        return Err(ApiError::Validation("password must be at least 6 characters long".to_string()));
    }

    if auth::hash_password(&payload.current_password, &user.email) != user.password {
        return Err(ApiError::Validation("current password is incorrect".to_string()));
    }

    let updated = User::update(user::ActiveModel {
        id: Unchanged(user.id),
        updated_at: Set(Local::now().fixed_offset()),
        password: Set(auth::hash_password(&payload.new_password, &user.email)),
        ..Default::default()
    }).exec(db.get_ref()).await?;

    Ok(ok_json("password changed successfully", updated))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde::de::IgnoredAny;

    use crate::auth::tests::test_user;

    use super::*;

    #[actix_web::test]
    async fn test_login() {
        let secret = b"secret";

        let user_password = "secret";
        let mut user = test_user(1, RoleType::Employee);
        user.password = auth::hash_password(user_password, &user.email);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                Vec::<user::Model>::new(),
                vec![user.clone()],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(login)
        ).await;

        {
            let forbidden_req = test::TestRequest::default()
                .uri("/login")
                .method(Method::POST)
                .set_json(Login {
                    email: "nobody@example.com".to_owned(),
                    password: "wrong".to_owned(),
                })
                .to_request();

            let response = test::call_service(&app, forbidden_req).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        {
            let success_req = test::TestRequest::default()
                .uri("/login")
                .method(Method::POST)
                .set_json(Login {
                    email: user.email.clone(),
                    password: user_password.to_owned(),
                })
                .to_request();

            let response = test::call_service(&app, success_req).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[actix_web::test]
    async fn test_register_duplicate_email() {
        let existing = test_user(1, RoleType::Employee);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()]]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(register)
        ).await;

        let req = test::TestRequest::default()
            .uri("/register")
            .method(Method::POST)
            .set_json(Register {
                name: "Bob".to_owned(),
                email: existing.email.clone(),
                password: "secret123".to_owned(),
                role: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_register_rejects_short_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.into_connection()))
                .service(register)
        ).await;

        let req = test::TestRequest::default()
            .uri("/register")
            .method(Method::POST)
            .set_json(Register {
                name: "Bob".to_owned(),
                email: "bob@example.com".to_owned(),
                password: "short".to_owned(),
                role: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_whoami_roundtrip() {
        let secret = b"secret";
        let user = test_user(3, RoleType::Hr);
        let token = Authority::new(secret).issue_for(&user);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .service(web::scope("/auth").service(whoami))
        ).await;

        let req = test::TestRequest::default()
            .uri("/auth")
            .insert_header(("Authorization", format!("JWT {token}")))
            .to_request();

        let _body: IgnoredAny = test::call_and_read_body_json(&app, req).await;
    }
}
