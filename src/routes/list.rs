use actix_web::{
    http::StatusCode,
    web::{self, ServiceConfig},
    HttpResponse, HttpResponseBuilder,
};
use serde::Deserialize;

use crate::{
    datastore::{Database, Filter, Key},
    error::ApiError,
    identity::Caller,
    models::{
        keyed::Keyed,
        list::{List, CREATOR_FIELD, LIST_KIND},
    },
};

/// Turns a caller supplied id into a list key. Ids of other kinds are
/// rejected the same way as garbage.
fn decode_list_key(id: &str) -> Result<Key, ApiError> {
    let key = Key::decode(id)?;
    if key.kind() != LIST_KIND {
        return Err(ApiError::BadRequest(format!("invalid id {:?}", id)));
    }
    Ok(key)
}

/// All lists, or only the caller's when someone is logged in.
async fn get_lists(caller: Caller, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let filter = caller
        .0
        .as_deref()
        .map(|user| Filter::eq(CREATOR_FIELD, user));
    let lists: Vec<_> = db
        .query::<List>(LIST_KIND, filter.as_ref())?
        .into_iter()
        .map(|(key, list)| Keyed::new(&key, list))
        .collect();
    Ok(HttpResponseBuilder::new(StatusCode::OK).json(lists))
}

async fn get_list(
    id: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let key = decode_list_key(&id)?;
    let list: List = db.get(&key)?;
    Ok(HttpResponseBuilder::new(StatusCode::OK).json(Keyed::new(&key, list)))
}

#[derive(Deserialize)]
struct PostListRequestData {
    name: String,
}
async fn post_list(
    body: web::Json<PostListRequestData>,
    caller: Caller,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let name = body.into_inner().name;
    if name.is_empty() {
        return Err(ApiError::BadRequest("missing list name".to_string()));
    }
    let new_model = List {
        name,
        creator: caller.0,
    };
    let key = db.put_new(LIST_KIND, &new_model)?;
    log::info!("created list {}", key);
    Ok(HttpResponseBuilder::new(StatusCode::OK).json(Keyed::new(&key, new_model)))
}

async fn delete_list(
    id: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let key = decode_list_key(&id)?;
    db.delete(&key)?;
    log::info!("deleted list {}", key);
    Ok(HttpResponseBuilder::new(StatusCode::NO_CONTENT).finish())
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("rejected list body: {}", err);
        ApiError::BadRequest(format!("decode list: {}", err)).into()
    })
}

pub fn configure_routes(config: &mut ServiceConfig) {
    config.app_data(json_config());
    config.route("", web::get().to(get_lists));
    config.route("", web::post().to(post_list));
    config.route("/{id}", web::get().to(get_list));
    config.route("/{id}", web::delete().to(delete_list));
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App, Scope};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use serde_json::{json, Value};

    use super::*;

    macro_rules! init_app {
        ($db:expr) => {
            test::init_service(App::new().app_data($db).service(list_scope())).await
        };
    }

    fn list_scope() -> Scope {
        Scope::new("/api/list").configure(configure_routes)
    }

    fn as_user(req: test::TestRequest, user: Option<&str>) -> test::TestRequest {
        match user {
            Some(user) => req.insert_header(("x-user-id", user)),
            None => req,
        }
    }

    fn post(name: Value, user: Option<&str>) -> test::TestRequest {
        let req = test::TestRequest::post()
            .uri("/api/list")
            .set_json(json!({ "name": name }));
        as_user(req, user)
    }

    fn get_all(user: Option<&str>) -> test::TestRequest {
        as_user(test::TestRequest::get().uri("/api/list"), user)
    }

    fn get_one(id: &str) -> test::TestRequest {
        test::TestRequest::get().uri(&format!("/api/list/{}", id))
    }

    fn delete(id: &str) -> test::TestRequest {
        test::TestRequest::delete().uri(&format!("/api/list/{}", id))
    }

    fn names(lists: &Value) -> Vec<&str> {
        lists
            .as_array()
            .unwrap()
            .iter()
            .map(|list| list["name"].as_str().unwrap())
            .collect()
    }

    #[actix_web::test]
    async fn create_get_delete_roundtrip() {
        let app = init_app!(web::Data::new(Database::in_memory()));

        let resp = test::call_service(&app, post(json!("Groceries"), None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let created: Value = test::read_body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        assert_eq!(created, json!({"id": id, "name": "Groceries"}));

        let resp = test::call_service(&app, get_one(&id).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let fetched: Value = test::read_body_json(resp).await;
        assert_eq!(fetched, created);

        let resp = test::call_service(&app, delete(&id).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = test::call_service(&app, get_one(&id).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "not_found");
    }

    #[actix_web::test]
    async fn created_ids_are_unique_for_equal_names() {
        let app = init_app!(web::Data::new(Database::in_memory()));

        let first: Value =
            test::call_and_read_body_json(&app, post(json!("Todo"), None).to_request()).await;
        let second: Value =
            test::call_and_read_body_json(&app, post(json!("Todo"), None).to_request()).await;
        assert_ne!(first["id"], second["id"]);
    }

    #[actix_web::test]
    async fn caller_supplied_id_is_ignored() {
        let app = init_app!(web::Data::new(Database::in_memory()));

        let req = test::TestRequest::post()
            .uri("/api/list")
            .set_json(json!({"id": "mine", "name": "Errands", "creator": "mallory"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let created: Value = test::read_body_json(resp).await;
        assert_ne!(created["id"], "mine");
        assert!(created.get("creator").is_none());
    }

    #[actix_web::test]
    async fn empty_name_is_rejected_without_mutation() {
        let app = init_app!(web::Data::new(Database::in_memory()));

        let resp = test::call_service(&app, post(json!(""), None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "bad_request");

        let lists: Value = test::call_and_read_body_json(&app, get_all(None).to_request()).await;
        assert_eq!(lists, json!([]));
    }

    #[actix_web::test]
    async fn malformed_body_is_bad_request() {
        let app = init_app!(web::Data::new(Database::in_memory()));

        let bodies = ["{\"name\":", "[]", "{\"title\":\"x\"}", "{\"name\":42}"];
        for body in bodies {
            let req = test::TestRequest::post()
                .uri("/api/list")
                .insert_header(("content-type", "application/json"))
                .set_payload(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {}", body);
            let err: Value = test::read_body_json(resp).await;
            assert_eq!(err["error"], "bad_request");
        }

        let lists: Value = test::call_and_read_body_json(&app, get_all(None).to_request()).await;
        assert_eq!(lists, json!([]));
    }

    #[actix_web::test]
    async fn malformed_id_is_bad_request() {
        let app = init_app!(web::Data::new(Database::in_memory()));

        let resp = test::call_service(&app, get_one("not-a-real-key").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&app, delete("not-a-real-key").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn uuid_spelling_variants_do_not_address_a_list() {
        let db = web::Data::new(Database::in_memory());
        let key = db
            .put_new(
                LIST_KIND,
                &List {
                    name: "Groceries".to_string(),
                    creator: None,
                },
            )
            .unwrap();
        let app = init_app!(db);

        let variants = [
            key.id().simple().to_string(),
            key.id().hyphenated().to_string().to_uppercase(),
            key.id().braced().to_string(),
            key.id().urn().to_string(),
        ];
        for variant in variants {
            let alias = URL_SAFE_NO_PAD.encode(format!("{}:{}", LIST_KIND, variant));
            let resp = test::call_service(&app, get_one(&alias).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", variant);
        }

        let fetched: Value =
            test::call_and_read_body_json(&app, get_one(&key.encode()).to_request()).await;
        assert_eq!(fetched["id"], key.encode());
    }

    #[actix_web::test]
    async fn id_of_another_kind_is_bad_request() {
        let db = web::Data::new(Database::in_memory());
        let foreign = db
            .put_new("Task", &json!({"name": "not a list"}))
            .unwrap()
            .encode();
        let app = init_app!(db);

        let resp = test::call_service(&app, get_one(&foreign).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_id_is_not_found() {
        let db = web::Data::new(Database::in_memory());
        // well formed, but its entity is gone
        let key = db
            .put_new(
                LIST_KIND,
                &List {
                    name: "gone".to_string(),
                    creator: None,
                },
            )
            .unwrap();
        db.delete(&key).unwrap();
        let app = init_app!(db);

        let resp = test::call_service(&app, get_one(&key.encode()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(&app, delete(&key.encode()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "not_found");
    }

    #[actix_web::test]
    async fn enumeration_is_scoped_to_caller() {
        let app = init_app!(web::Data::new(Database::in_memory()));

        let owners = [
            ("a", Some("alice")),
            ("b", Some("bob")),
            ("c", None),
            ("d", Some("alice")),
            ("e", Some("carol")),
        ];
        for (name, owner) in owners {
            let resp = test::call_service(&app, post(json!(name), owner).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let all: Value = test::call_and_read_body_json(&app, get_all(None).to_request()).await;
        assert_eq!(names(&all), ["a", "b", "c", "d", "e"]);

        let alice: Value =
            test::call_and_read_body_json(&app, get_all(Some("alice")).to_request()).await;
        assert_eq!(names(&alice), ["a", "d"]);
        for list in alice.as_array().unwrap() {
            assert_eq!(list["creator"], "alice");
        }

        let dave: Value =
            test::call_and_read_body_json(&app, get_all(Some("dave")).to_request()).await;
        assert_eq!(dave, json!([]));
    }

    #[actix_web::test]
    async fn enumerated_ids_address_their_lists() {
        let app = init_app!(web::Data::new(Database::in_memory()));
        for name in ["one", "two", "three"] {
            test::call_service(&app, post(json!(name), Some("alice")).to_request()).await;
        }

        let all: Value = test::call_and_read_body_json(&app, get_all(None).to_request()).await;
        for list in all.as_array().unwrap() {
            let id = list["id"].as_str().unwrap();
            let fetched: Value =
                test::call_and_read_body_json(&app, get_one(id).to_request()).await;
            assert_eq!(&fetched, list);
        }
    }

    #[actix_web::test]
    async fn store_failure_is_opaque_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("db");
        let app = init_app!(web::Data::new(Database::open(&store_dir).unwrap()));

        std::fs::remove_dir_all(&store_dir).unwrap();

        let resp = test::call_service(&app, post(json!("Groceries"), None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({"error": "internal_error", "message": "internal server error"})
        );
    }
}
