use super::*;

impl FromRequest for payroll::Model {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let id = req.match_info().get("id").expect("This extractor must be used under an `id` path");
            let Ok(id) = id.parse::<i32>() else {
                return Err(ApiError::Validation("invalid payroll id".to_string()).into())
            };

            let db = req.app_data::<web::Data<DatabaseConnection>>().expect("DatabaseConnection must be attached");

            let record = Payroll::find_by_id(id)
                .one(db.as_ref()).await
                .map_err(ApiError::from)?
                .ok_or(ApiError::NotFound("payroll record"))?;

            Ok(record)
        })
    }
}
