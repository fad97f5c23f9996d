//! Tests for `CellarService`.

use std::net::SocketAddr;

use tokio_stream::wrappers::TcpListenerStream;
use tonic::Code;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Server;

use cellar_proto::v1::cellar_service_client::CellarServiceClient;
use cellar_proto::v1::cellar_service_server::CellarService;
use cellar_proto::v1::{
    BottleFields, BottleStatus, CreateBottleRequest, CreateLocationRequest, GetBottleRequest,
    GetCellarSummaryRequest, ListBottlesRequest, LogDrinkRequest, ScanLabelRequest,
    SetBottleStatusRequest, UploadImageRequest,
};

use super::cellar_svc::CellarServiceImpl;
use super::interceptor::owner_interceptor;
use super::test_helpers::{bearer_request, error_kind, owner_request, test_db, test_tokens};
use crate::cellar::CellarManager;
use crate::media::LocalObjectStore;

async fn setup() -> (CellarServiceImpl, tempfile::TempDir) {
    let db = test_db().await;
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path(), "/media", 1024);
    let svc = CellarServiceImpl::new(CellarManager::new(db), store, None);
    (svc, dir)
}

fn fields(name: &str) -> BottleFields {
    BottleFields {
        name: name.into(),
        ..BottleFields::default()
    }
}

async fn create(svc: &CellarServiceImpl, name: &str, quantity: u32) -> String {
    svc.create_bottle(owner_request(
        CreateBottleRequest {
            fields: Some(fields(name)),
            quantity: Some(quantity),
        },
        "u1",
    ))
    .await
    .unwrap()
    .into_inner()
    .bottle
    .unwrap()
    .id
}

#[tokio::test]
async fn list_bottles_filters_by_status() {
    let (svc, _dir) = setup().await;
    create(&svc, "Barolo", 2).await;
    let port = create(&svc, "Port", 1).await;

    let archived = svc
        .set_bottle_status(owner_request(
            SetBottleStatusRequest {
                bottle_id: port.clone(),
                status: BottleStatus::Archived.into(),
            },
            "u1",
        ))
        .await
        .unwrap()
        .into_inner()
        .bottle
        .unwrap();
    assert_eq!(archived.status(), BottleStatus::Archived);
    assert_eq!(archived.quantity, 1);

    let in_cellar = svc
        .list_bottles(owner_request(
            ListBottlesRequest {
                status_filter: BottleStatus::InCellar.into(),
                ..ListBottlesRequest::default()
            },
            "u1",
        ))
        .await
        .unwrap()
        .into_inner()
        .bottles;
    assert_eq!(in_cellar.len(), 1);
    assert_eq!(in_cellar[0].name, "Barolo");

    let all = svc
        .list_bottles(owner_request(ListBottlesRequest::default(), "u1"))
        .await
        .unwrap()
        .into_inner()
        .bottles;
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn bottle_requests_are_validated() {
    let (svc, _dir) = setup().await;

    let err = svc
        .create_bottle(owner_request(CreateBottleRequest::default(), "u1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(error_kind(&err), "validation");

    let id = create(&svc, "Barolo", 1).await;
    let err = svc
        .set_bottle_status(owner_request(
            SetBottleStatusRequest {
                bottle_id: id,
                status: BottleStatus::Unspecified.into(),
            },
            "u1",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn bottles_are_scoped_to_their_owner() {
    let (svc, _dir) = setup().await;
    let id = create(&svc, "Barolo", 1).await;

    let err = svc
        .get_bottle(owner_request(GetBottleRequest { bottle_id: id }, "u2"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert_eq!(error_kind(&err), "not_found");
    assert_eq!(err.message(), "Bottle not found");
}

#[tokio::test]
async fn duplicate_location_is_already_exists() {
    let (svc, _dir) = setup().await;
    let req = || {
        owner_request(
            CreateLocationRequest {
                name: "Basement".into(),
            },
            "u1",
        )
    };
    svc.create_location(req()).await.unwrap();
    let err = svc.create_location(req()).await.unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);
}

#[tokio::test]
async fn log_drink_returns_updated_bottle() {
    let (svc, _dir) = setup().await;
    let id = create(&svc, "Chianti", 2).await;

    let resp = svc
        .log_drink(owner_request(
            LogDrinkRequest {
                bottle_id: Some(id.clone()),
                quantity: 2,
                rating: Some(88),
                ..LogDrinkRequest::default()
            },
            "u1",
        ))
        .await
        .unwrap()
        .into_inner();
    let log = resp.log.unwrap();
    assert_eq!(log.bottle_id.as_deref(), Some(id.as_str()));
    assert!(log.drunk_at.unwrap().seconds > 0);

    let bottle = resp.bottle.unwrap();
    assert_eq!(bottle.quantity, 0);
    assert_eq!(bottle.status(), BottleStatus::Consumed);

    let summary = svc
        .get_cellar_summary(owner_request(GetCellarSummaryRequest {}, "u1"))
        .await
        .unwrap()
        .into_inner()
        .summary
        .unwrap();
    assert_eq!(summary.by_status.len(), 3);
    assert_eq!(summary.drink_log_count, 1);
    assert_eq!(summary.average_rating, Some(88));
}

#[tokio::test]
async fn upload_image_stores_file() {
    let (svc, dir) = setup().await;

    let url = svc
        .upload_image(owner_request(
            UploadImageRequest {
                data: b"jpeg-bytes".to_vec(),
                content_type: "image/jpeg".into(),
            },
            "u1",
        ))
        .await
        .unwrap()
        .into_inner()
        .url;
    let name = url.strip_prefix("/media/").unwrap();
    assert!(dir.path().join(name).exists());

    let err = svc
        .upload_image(owner_request(
            UploadImageRequest {
                data: b"%PDF".to_vec(),
                content_type: "application/pdf".into(),
            },
            "u1",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn scan_label_without_endpoint_is_failed_precondition() {
    let (svc, _dir) = setup().await;
    let err = svc
        .scan_label(owner_request(
            ScanLabelRequest {
                data: b"jpeg-bytes".to_vec(),
                content_type: "image/jpeg".into(),
            },
            "u1",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}

const MIB: usize = 1024 * 1024;

/// Serve the cellar service over loopback behind the owner interceptor.
async fn serve(svc: CellarServiceImpl) -> (SocketAddr, String) {
    let tokens = test_tokens();
    let (token, _) = tokens.sign_owner_token("u1", "alice@example.com").unwrap();
    let service = InterceptedService::new(svc.into_server(), owner_interceptor(tokens));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        Server::builder()
            .add_service(service)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    (addr, token)
}

#[tokio::test]
async fn uploads_above_default_grpc_limit_reach_the_store() {
    let db = test_db().await;
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path(), "/media", 6 * MIB);
    let (addr, token) = serve(CellarServiceImpl::new(CellarManager::new(db), store, None)).await;

    let mut client = CellarServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    let url = client
        .upload_image(bearer_request(
            UploadImageRequest {
                data: vec![0xFF; 4 * MIB + 1024],
                content_type: "image/jpeg".into(),
            },
            &token,
        ))
        .await
        .unwrap()
        .into_inner()
        .url;
    assert!(url.starts_with("/media/"));

    let err = client
        .upload_image(bearer_request(
            UploadImageRequest {
                data: vec![0xFF; 6 * MIB + 1],
                content_type: "image/jpeg".into(),
            },
            &token,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(error_kind(&err), "validation");
}
