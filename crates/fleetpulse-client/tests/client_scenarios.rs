//! End-to-end scenarios against a programmable fake transport.

use std::sync::Arc;

use serde_json::json;
use tokio::time::{advance, Duration};

use fleetpulse_client::api::models::{
    LoginRequest, RegisterVehicleRequest, ResetPasswordRequest, UpdateVehicleRequest,
};
use fleetpulse_client::api::routes::Method;
use fleetpulse_client::api::ApiError;
use fleetpulse_client::{FakeTransport, FleetClient};

fn client_with(fake: &FakeTransport) -> FleetClient {
    FleetClient::builder()
        .base_url("https://fleet.test")
        .transport(Arc::new(fake.clone()))
        .build()
}

async fn stub_login_success(fake: &FakeTransport, role: &str) {
    fake.stub_envelope(
        Method::Post,
        "/login",
        json!({
            "access_token": "T",
            "employee": {
                "email": "driver@fleet.test",
                "full_name": "Dana Driver",
                "role": role,
            },
        }),
    )
    .await;
}

#[tokio::test]
async fn login_stores_the_token_and_routes_by_role() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "user").await;
    let client = client_with(&fake);

    let outcome = client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.employee.email, "driver@fleet.test");
    assert_eq!(
        outcome.landing,
        fleetpulse_client::api::models::Landing::UserDashboard
    );
    assert_eq!(client.session().token().await.as_deref(), Some("T"));

    let requests = fake.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Post);
    assert!(requests[0].bearer.is_none());
    assert_eq!(
        requests[0].body.as_ref().unwrap()["email"],
        json!("driver@fleet.test")
    );
}

#[tokio::test]
async fn rejected_login_surfaces_the_backend_message() {
    let fake = FakeTransport::new();
    fake.stub_rejection(Method::Post, "/login", "01", "Invalid credentials")
        .await;
    let client = client_with(&fake);

    let err = client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(matches!(err, ApiError::Backend { .. }));
    assert_eq!(client.session().token().await, None);
}

#[tokio::test]
async fn invalid_input_never_reaches_the_network() {
    let fake = FakeTransport::new();
    let client = client_with(&fake);

    let err = client
        .login(&LoginRequest {
            email: "not-an-email".into(),
            password: "".into(),
        })
        .await
        .unwrap_err();

    match err {
        ApiError::Validation { violations } => {
            // Both failures reported at once.
            assert_eq!(violations.len(), 2);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(fake.requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn vehicle_list_reads_within_the_ttl_share_one_request() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "user").await;
    fake.stub_envelope(
        Method::Get,
        "/vehicles",
        json!([{"sensor_imei": "860000000000001", "vehicle_vin": "VIN1"}]),
    )
    .await;
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    let first = client.vehicles().await;
    assert_eq!(first.data.unwrap().len(), 1);
    advance(Duration::from_secs(3)).await;
    let second = client.vehicles().await;
    assert_eq!(second.data.unwrap().len(), 1);
    assert_eq!(fake.call_count("/vehicles").await, 1);

    // Past the 10s window the next read goes back to the network.
    advance(Duration::from_secs(11)).await;
    client.vehicles().await;
    assert_eq!(fake.call_count("/vehicles").await, 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_list_reads_are_coalesced() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "user").await;
    fake.stub_envelope(Method::Get, "/vehicles", json!([])).await;
    fake.delay_last(Duration::from_millis(50)).await;
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move { client.vehicles().await }));
    }
    for task in tasks {
        let result = task.await.unwrap();
        assert_eq!(result.data.unwrap().len(), 0);
        assert!(result.error.is_none());
    }
    assert_eq!(fake.call_count("/vehicles").await, 1);
}

#[tokio::test]
async fn vehicle_update_invalidates_the_cached_list() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "admin").await;
    fake.stub_envelope(
        Method::Get,
        "/vehicles",
        json!([{"sensor_imei": "860000000000001", "vehicle_vin": "VIN1"}]),
    )
    .await;
    fake.stub_envelope(Method::Put, "/admin/vehicle/42", json!(null))
        .await;
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "ops@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    client.vehicles().await;
    client.vehicles().await;
    assert_eq!(fake.call_count("/vehicles").await, 1);

    client
        .update_vehicle(
            42,
            &UpdateVehicleRequest {
                vehicle_is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    client.vehicles().await;
    assert_eq!(fake.call_count("/vehicles").await, 2);
}

#[tokio::test]
async fn registering_a_vehicle_refreshes_the_fleet_list() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "admin").await;
    fake.stub_envelope(Method::Get, "/vehicles", json!([])).await;
    fake.stub_envelope(Method::Post, "/admin/register-vehicle", json!(null))
        .await;
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "ops@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    client.vehicles().await;
    client.vehicles().await;
    assert_eq!(fake.call_count("/vehicles").await, 1);

    client
        .register_vehicle(&RegisterVehicleRequest {
            user_email: "driver@fleet.test".into(),
            sensor_imei: "860000000000002".into(),
            vehicle_vin: "VIN2".into(),
            vehicle_brand: "Toyota".into(),
            vehicle_model: "Hilux".into(),
            vehicle_year: 2021,
            vehicle_color: "white".into(),
            vehicle_plate_number: "B 1234 XY".into(),
            vehicle_fuel_type: "diesel".into(),
            vehicle_transmission: "manual".into(),
        })
        .await
        .unwrap();

    client.vehicles().await;
    assert_eq!(fake.call_count("/vehicles").await, 2);
}

#[tokio::test]
async fn password_reset_invalidates_the_cached_user_lookup() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "admin").await;
    fake.stub_envelope(
        Method::Get,
        "/admin/user/driver@fleet.test",
        json!({"email": "driver@fleet.test", "full_name": "Dana Driver", "role": "user"}),
    )
    .await;
    fake.stub_envelope(
        Method::Get,
        "/admin/user/driver@fleet.test/vehicles",
        json!([{"sensor_imei": "860000000000001", "vehicle_vin": "VIN1"}]),
    )
    .await;
    fake.stub_envelope(Method::Post, "/admin/reset-password", json!(null))
        .await;
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "ops@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    let user = client.admin_user("driver@fleet.test").await;
    assert_eq!(user.data.unwrap().email, "driver@fleet.test");
    client.admin_user("driver@fleet.test").await;
    assert_eq!(fake.call_count("/admin/user/driver@fleet.test").await, 1);

    let owned = client.admin_user_vehicles("driver@fleet.test").await;
    assert_eq!(owned.data.unwrap().len(), 1);

    client
        .reset_password(&ResetPasswordRequest {
            email: "driver@fleet.test".into(),
            new_password: "new-hunter22".into(),
        })
        .await
        .unwrap();

    client.admin_user("driver@fleet.test").await;
    assert_eq!(fake.call_count("/admin/user/driver@fleet.test").await, 2);
}

#[tokio::test]
async fn expired_token_logs_the_session_out() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "user").await;
    fake.stub(
        Method::Get,
        "/me",
        401,
        json!({"responseCode": "99", "responseMessage": "Token expired"}).to_string(),
    )
    .await;
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    assert_eq!(client.current_user().await.unwrap(), None);
    assert_eq!(client.session().token().await, None);

    // With no stored token the next check is answered locally.
    assert_eq!(client.current_user().await.unwrap(), None);
    assert_eq!(fake.call_count("/me").await, 1);
}

#[tokio::test]
async fn missing_telemetry_reads_as_no_data() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "user").await;
    fake.stub(
        Method::Get,
        "/vehicle/860000000000001/data",
        404,
        json!({"responseCode": "44", "responseMessage": "No data"}).to_string(),
    )
    .await;
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    let result = client.vehicle_data("860000000000001").await;
    assert!(result.error.is_none());
    assert_eq!(result.data, Some(None));
}

#[tokio::test]
async fn logout_clears_credential_and_cache_even_when_the_wire_fails() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "user").await;
    fake.stub_envelope(Method::Get, "/vehicles", json!([])).await;
    // No /logout stub: the request fails, the local teardown still runs.
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();
    client.vehicles().await;

    client.logout().await.unwrap();
    assert_eq!(client.session().token().await, None);
    assert_eq!(client.current_user().await.unwrap(), None);

    // The cached list did not survive the logout.
    client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();
    client.vehicles().await;
    assert_eq!(fake.call_count("/vehicles").await, 2);
}

#[tokio::test(start_paused = true)]
async fn polling_pushes_fresh_reads_until_cancelled() {
    let fake = FakeTransport::new();
    stub_login_success(&fake, "user").await;
    fake.stub_envelope(Method::Get, "/vehicles", json!([])).await;
    let client = client_with(&fake);
    client
        .login(&LoginRequest {
            email: "driver@fleet.test".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    let (handle, mut rx) = client.poll_vehicles(Duration::from_secs(10));
    let first = rx.recv().await.unwrap();
    assert_eq!(first.data.unwrap().len(), 0);

    advance(Duration::from_secs(10)).await;
    let second = rx.recv().await.unwrap();
    assert!(second.error.is_none());
    // Each tick bypassed the cache.
    assert_eq!(fake.call_count("/vehicles").await, 2);

    handle.cancel();
    assert!(rx.recv().await.is_none());
}
