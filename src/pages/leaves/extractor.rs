use std::ops::Deref;

use super::*;

impl FromRequest for leave::Model {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let id = req.match_info().get("id").expect("This extractor must be used under an `id` path");
            let Ok(id) = id.parse::<i32>() else {
                return Err(ApiError::Validation("invalid leave id".to_string()).into())
            };

            let db = req.app_data::<web::Data<DatabaseConnection>>().expect("DatabaseConnection must be attached");

            let leave = Leave::find_by_id(id)
                .one(db.as_ref()).await
                .map_err(ApiError::from)?
                .ok_or(ApiError::NotFound("leave request"))?;

            Ok(leave)
        })
    }
}

/// Decision and edit endpoints only operate on requests nobody has ruled on.
pub(super) struct PendingLeave(pub(super) leave::Model);

impl Deref for PendingLeave {
    type Target = leave::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for PendingLeave {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let leave = leave::Model::from_request(&req, &mut dev::Payload::None).await?;

            if leave.status != LeaveStatus::Pending {
                return Err(ApiError::State("leave request has already been processed".to_string()).into());
            }

            Ok(Self(leave))
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    use crate::{auth::{tests::test_user, Authority}, entity::sea_orm_active_enums::RoleType};

    use super::{super::tests::test_leave, *};

    #[actix_web::test]
    async fn test_pending_leave_extractor() {
        #[get("/{id}")]
        async fn test_handler(leave: PendingLeave) -> impl Responder {
            web::Json(leave.0)
        }

        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Hr));

        let pending = test_leave(1, 3, LeaveStatus::Pending);
        let approved = test_leave(2, 3, LeaveStatus::Approved);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ pending.clone() ],
                vec![ approved.clone() ],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(test_handler)
        ).await;

        let req = test::TestRequest::default()
            .uri("/1")
            .insert_header(("Authorization", format!("JWT {token}")))
            .to_request();

        let returned: leave::Model = test::call_and_read_body_json(&app, req).await;
        assert_eq!(returned, pending);

        let req = test::TestRequest::default()
            .uri("/2")
            .insert_header(("Authorization", format!("JWT {token}")))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
