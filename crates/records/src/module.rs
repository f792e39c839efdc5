use std::sync::Arc;

use recordkeep_functions::{
    CallableHandler, Endpoint, FailurePolicy, HttpHandler, HttpMethod, Module, ModuleExports,
    set_increment_id_trigger,
};
use recordkeep_infra::DocumentStore;

use crate::assemblers::{
    assemble_callable_create_record_request, assemble_http_create_record_request, assemble_http_get_record_request,
    assemble_http_list_records_request,
};
use crate::handlers::{CreateRecordHandler, GetRecordHandler, ListRecordsHandler};
use crate::repository::{RECORDS_COLLECTION, record_repository};
use crate::service::RecordService;
use crate::validators::{
    validate_callable_create_record_request, validate_http_create_record_request, validate_http_get_record_request,
    validate_http_list_records_request,
};

/// Wires the records repository, service, endpoints and trigger over a store.
pub struct RecordsModule {
    store: Arc<dyn DocumentStore>,
    failure_policy: FailurePolicy,
}

impl RecordsModule {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

impl Module for RecordsModule {
    fn name(&self) -> &str {
        "records"
    }

    fn exports(&self) -> ModuleExports {
        let repository = record_repository(self.store.clone());
        let service = RecordService::new(Arc::new(repository));

        let create_record = HttpHandler::new(
            HttpMethod::Post,
            CreateRecordHandler::new(service.clone()),
            validate_http_create_record_request,
            assemble_http_create_record_request,
        );

        let call_create_record = CallableHandler::new(
            CreateRecordHandler::new(service.clone()),
            validate_callable_create_record_request,
            assemble_callable_create_record_request,
        );

        let get_record = HttpHandler::new(
            HttpMethod::Get,
            GetRecordHandler::new(service.clone()),
            validate_http_get_record_request,
            assemble_http_get_record_request,
        );

        let list_records = HttpHandler::new(
            HttpMethod::Get,
            ListRecordsHandler::new(service),
            validate_http_list_records_request,
            assemble_http_list_records_request,
        );

        let record_set_increment_id =
            set_increment_id_trigger(RECORDS_COLLECTION, self.store.clone(), self.failure_policy);

        ModuleExports::default()
            .function("createRecord", Endpoint::http(create_record))
            .function("callCreateRecord", Endpoint::callable(call_create_record))
            .function("getRecord", Endpoint::http(get_record))
            .function("listRecords", Endpoint::http(list_records))
            .trigger("recordSetIncrementId", record_set_increment_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use recordkeep_auth::{AuthContext, JwtClaims, PrincipalId};
    use recordkeep_events::DocumentChange;
    use recordkeep_functions::{CallableRequest, FunctionsErrorCode, HttpFunction, HttpRequest};
    use recordkeep_infra::InMemoryDocumentStore;
    use serde_json::{Value as JsonValue, json};

    use super::*;

    fn module() -> (Arc<dyn DocumentStore>, ModuleExports) {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let exports = RecordsModule::new(store.clone()).exports();
        (store, exports)
    }

    fn http(exports: &ModuleExports, name: &str) -> Arc<dyn HttpFunction> {
        match exports.functions.get(name) {
            Some(Endpoint::Http(function)) => function.clone(),
            other => panic!("{name} is not an http function: {other:?}"),
        }
    }

    fn caller() -> AuthContext {
        let now = Utc::now();
        AuthContext::from_claims(JwtClaims {
            sub: PrincipalId::new("tester"),
            email: None,
            issued_at: now,
            expires_at: now + Duration::minutes(5),
        })
    }

    #[test]
    fn exports_expected_names() {
        let (_, exports) = module();
        let functions: Vec<_> = exports.functions.keys().map(String::as_str).collect();
        assert_eq!(functions, vec!["callCreateRecord", "createRecord", "getRecord", "listRecords"]);
        assert!(exports.triggers.contains_key("recordSetIncrementId"));
    }

    #[tokio::test]
    async fn create_then_get_over_http() {
        let (store, exports) = module();

        let created = http(&exports, "createRecord")
            .call(HttpRequest::new(HttpMethod::Post, json!({ "name": "Test Record" })))
            .await;
        assert_eq!(created.status, 200);
        let body = created.body.unwrap();
        assert_eq!(body["name"], "Test Record");
        let id = body["id"].as_str().unwrap().to_string();

        let stored = store
            .get(RECORDS_COLLECTION, &id.parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.get("name"), Some(&json!("Test Record")));

        let fetched = http(&exports, "getRecord")
            .call(HttpRequest::new(HttpMethod::Get, JsonValue::Null).with_query("id", id))
            .await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body.unwrap()["name"], "Test Record");
    }

    #[tokio::test]
    async fn missing_name_and_wrong_method() {
        let (store, exports) = module();
        let create = http(&exports, "createRecord");

        let invalid = create.call(HttpRequest::new(HttpMethod::Post, json!({}))).await;
        assert_eq!(invalid.status, 400);
        assert_eq!(
            invalid.body,
            Some(json!({ "message": "Field name is required", "code": 2, "httpCode": 400 }))
        );

        let wrong = create
            .call(HttpRequest::new(HttpMethod::Get, json!({ "name": "X" })))
            .await;
        assert_eq!(wrong.status, 405);
        assert!(wrong.body.is_none());

        assert!(store.list(RECORDS_COLLECTION).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_record_is_404() {
        let (_, exports) = module();

        let response = http(&exports, "getRecord")
            .call(HttpRequest::new(HttpMethod::Get, JsonValue::Null).with_query("id", "missing"))
            .await;
        assert_eq!(response.status, 404);
        assert_eq!(
            response.body,
            Some(json!({ "message": "Record not found", "code": 3, "httpCode": 404 }))
        );
    }

    #[tokio::test]
    async fn callable_requires_auth_then_creates() {
        let (_, exports) = module();
        let Some(Endpoint::Callable(call)) = exports.functions.get("callCreateRecord").cloned() else {
            panic!("callCreateRecord is not callable");
        };

        let err = call
            .call(CallableRequest::new(json!({ "name": "X" })))
            .await
            .unwrap_err();
        assert_eq!(err.code(), FunctionsErrorCode::Unauthenticated);

        let err = call
            .call(CallableRequest::new(json!({})).with_auth(caller()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), FunctionsErrorCode::Internal);
        assert_eq!(err.message(), "Field name is required");

        let record = call
            .call(CallableRequest::new(json!({ "name": "X" })).with_auth(caller()))
            .await
            .unwrap();
        assert_eq!(record["name"], "X");
    }

    #[tokio::test]
    async fn trigger_stamps_increment_ids_in_dispatch_order() {
        let (store, exports) = module();
        let create = http(&exports, "createRecord");
        let trigger = &exports.triggers["recordSetIncrementId"];

        let mut ids = Vec::new();
        for name in ["first", "second"] {
            let body = create
                .call(HttpRequest::new(HttpMethod::Post, json!({ "name": name })))
                .await
                .body
                .unwrap();
            let id = body["id"].as_str().unwrap().parse().unwrap();
            let after = store.get(RECORDS_COLLECTION, &id).await.unwrap();
            let change = DocumentChange::between(RECORDS_COLLECTION, id.clone(), None, after).unwrap();
            trigger.fire(&change).await.unwrap();
            ids.push(id);
        }

        let listed = http(&exports, "listRecords")
            .call(HttpRequest::new(HttpMethod::Get, JsonValue::Null))
            .await
            .body
            .unwrap();
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 2);

        for (expected, id) in [1, 2].into_iter().zip(&ids) {
            let record = listed.iter().find(|r| r["id"] == id.as_str()).unwrap();
            assert_eq!(record["increment_id"], expected);
        }
    }
}
