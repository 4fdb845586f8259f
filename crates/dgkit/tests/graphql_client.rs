use dgkit::{Config, DgkitError, client, decode_token, scoped_client, token, tokenized_client};
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let addr = server.address();
    Config::new(
        format!("http://{}", addr.ip()),
        addr.port(),
        "schema.graphql",
        "user",
        "secret",
    )
}

#[derive(Debug, Deserialize, PartialEq)]
struct Users {
    #[serde(rename = "queryUser")]
    query_user: Vec<User>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    name: String,
}

#[tokio::test]
async fn request_sends_bearer_token_to_graphql_endpoint() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    let token = token("alice", &config).unwrap();

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .and(body_partial_json(json!({
            "query": "query($first: Int) { queryUser(first: $first) { name } }",
            "variables": { "first": 1 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "queryUser": [{ "name": "alice" }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = tokenized_client(token, &config);
    let users: Users = client
        .request(
            "query($first: Int) { queryUser(first: $first) { name } }",
            json!({ "first": 1 }),
        )
        .await
        .unwrap();
    assert_eq!(users.query_user, vec![User { name: "alice".to_string() }]);
}

#[tokio::test]
async fn graphql_errors_are_returned_as_error() {
    let server = MockServer::start().await;
    let config = config_for(&server);

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Not resolving queryUser. There's no GraphQL schema in Dgraph." }]
        })))
        .mount(&server)
        .await;

    let client = client("alice", &config).unwrap();
    let err = client
        .request::<_, serde_json::Value>("{ queryUser { name } }", json!({}))
        .await
        .unwrap_err();
    match err {
        DgkitError::GraphQL { errors } => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].message.starts_with("Not resolving queryUser"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn raw_request_keeps_partial_data_and_errors() {
    let server = MockServer::start().await;
    let config = config_for(&server);

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "a": 1 },
            "errors": [{ "message": "partial", "path": ["b"] }]
        })))
        .mount(&server)
        .await;

    let response = client("alice", &config)
        .unwrap()
        .raw_request::<serde_json::Value, serde_json::Value>("{ a b }", None)
        .await
        .unwrap();
    assert_eq!(response.data, Some(json!({ "a": 1 })));
    assert_eq!(response.errors()[0].path, Some(json!(["b"])));
}

#[tokio::test]
async fn scoped_clients_carry_their_own_claims() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    let factory = scoped_client(&config);

    for name in ["alice", "bob"] {
        let client = factory(name).unwrap();
        assert_eq!(client.endpoint(), format!("{}/graphql", server.uri()));

        let token = client.authorization().trim_start_matches("Bearer ").to_string();
        let payload = decode_token(&token, &config).unwrap();
        assert_eq!(payload["user"], name);
    }
}
