use serde_json::json;
use tidal_core::{DeploymentRef, HttpSettings, WorkloadController};
use tidal_kube::{KubeClient, KubeError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEPLOYMENT: &str = "/apis/apps/v1/namespaces/default/deployments/web";

fn client(server: &MockServer) -> KubeClient {
    KubeClient::new(&server.uri(), "tok", HttpSettings::default()).unwrap()
}

#[tokio::test]
async fn list_pods_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pods"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "PodList",
            "items": [
                {"metadata": {"name": "web-6f7d-abcde", "namespace": "default"}},
                {"metadata": {"name": "coredns-1", "namespace": "kube-system"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pods = client(&server).list_pods().await.unwrap();
    assert_eq!(pods, vec!["web-6f7d-abcde", "coredns-1"]);
}

#[tokio::test]
async fn unauthorized_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pods"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "kind": "Status", "status": "Failure", "reason": "Unauthorized", "code": 401
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_pods().await.unwrap_err();
    assert!(matches!(err, KubeError::Status { status, .. } if status.as_u16() == 401));
}

#[tokio::test]
async fn deployment_names_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apis/apps/v1/deployments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"metadata": {"name": "web"}}, {"metadata": {"name": "api"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DEPLOYMENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"replicas": 4},
            "status": {"readyReplicas": 3}
        })))
        .mount(&server)
        .await;

    let kube = client(&server);
    assert_eq!(kube.deployment_names().await.unwrap(), vec!["web", "api"]);

    let state = kube
        .status(&DeploymentRef::new("web", "default"))
        .await
        .unwrap();
    assert_eq!(state.name, "web");
    assert_eq!(state.namespace, "default");
    assert_eq!(state.current_replicas, 4);
}

#[tokio::test]
async fn scale_patches_replicas() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{DEPLOYMENT}/scale")))
        .and(header("content-type", "application/strategic-merge-patch+json"))
        .and(body_json(json!({"spec": {"replicas": 6}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Scale",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"replicas": 6},
            "status": {"replicas": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .set_replicas(&DeploymentRef::new("web", "default"), 6)
        .await
        .unwrap();
}

#[tokio::test]
async fn scale_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{DEPLOYMENT}/scale")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spec": {"replicas": 4}
        })))
        .mount(&server)
        .await;

    let err = client(&server).scale("web", "default", 6).await.unwrap_err();
    assert!(matches!(
        err,
        KubeError::ScaleRejected { requested: 6, reported: 4, .. }
    ));
}

#[tokio::test]
async fn secret_credentials_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/kube-system/secrets/thunder-creds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Secret",
            "type": "Opaque",
            // admin / a10
            "data": {"username": "YWRtaW4=", "password": "YTEw"}
        })))
        .mount(&server)
        .await;

    let creds = client(&server)
        .secret_credentials("thunder-creds", "kube-system")
        .await
        .unwrap();
    assert_eq!(creds.username, "admin");
    assert_eq!(creds.password, "a10");
}

#[tokio::test]
async fn secret_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/default/secrets/partial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"username": "YWRtaW4="}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/default/secrets/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"username": "not base64!", "password": "YTEw"}
        })))
        .mount(&server)
        .await;

    let kube = client(&server);
    assert!(matches!(
        kube.secret_credentials("partial", "default").await,
        Err(KubeError::MissingKey { key: "password", .. })
    ));
    assert!(matches!(
        kube.secret_credentials("garbled", "default").await,
        Err(KubeError::Base64 { key: "username", .. })
    ));
}
