use axum::{Extension, extract::State, http::HeaderMap};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::entitlements::{RegistrationOutcome, evaluate};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::jwt::Identity;
use crate::models::Device;
use crate::util::device_fingerprint;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyDownloadRequest {
    #[serde(default)]
    pub device_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyDownloadResponse {
    pub success: bool,
    pub message: String,
    pub plan: String,
    pub device: Device,
    pub already_registered: bool,
    pub devices_used: i64,
    pub max_devices: i64,
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<Device>,
    pub devices_used: usize,
    pub max_devices: i64,
}

#[derive(Debug, Serialize)]
pub struct RemoveDeviceResponse {
    pub success: bool,
    pub devices_used: usize,
}

/// POST /download/verify - Check the license and claim a device slot
///
/// The device is identified by a fingerprint of the caller's address and
/// user-agent. Registration is atomic against the account's quota.
pub async fn verify_download(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
    Json(input): Json<VerifyDownloadRequest>,
) -> Result<Json<VerifyDownloadResponse>> {
    let mut conn = state.db.get()?;
    let account = queries::get_account_by_id(&conn, &identity.account_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let (plan, _) = evaluate(&account, Utc::now().timestamp()).into_result()?;

    let fingerprint = device_fingerprint(&headers);
    let outcome = queries::register_device_atomic(
        &mut conn,
        &account.id,
        &fingerprint,
        input.device_name.as_deref(),
    )?;

    let (device, devices_used, max_devices, already_registered) = match outcome {
        RegistrationOutcome::AlreadyRegistered {
            device,
            devices_used,
            max_devices,
        } => (device, devices_used, max_devices, true),
        RegistrationOutcome::LimitReached { current, max } => {
            tracing::info!(account_id = %account.id, current, max, "Device limit reached");
            return Err(AppError::QuotaExceeded { current, max });
        }
        RegistrationOutcome::Registered {
            device,
            devices_used,
            max_devices,
        } => {
            tracing::info!(account_id = %account.id, device_id = %device.id, "Device registered");
            (device, devices_used, max_devices, false)
        }
    };

    Ok(Json(VerifyDownloadResponse {
        success: true,
        message: if already_registered {
            "Device already registered".into()
        } else {
            "Device registered successfully".into()
        },
        plan: plan.to_string(),
        device,
        already_registered,
        devices_used,
        max_devices,
    }))
}

/// GET /devices - The caller's registered devices
pub async fn list_devices(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<DeviceListResponse>> {
    let conn = state.db.get()?;
    let account = queries::get_account_by_id(&conn, &identity.account_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(DeviceListResponse {
        devices_used: account.devices.len(),
        devices: account.devices,
        max_devices: account.max_devices,
    }))
}

/// DELETE /devices/{fingerprint} - Free a device slot
pub async fn remove_device(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(fingerprint): Path<String>,
) -> Result<Json<RemoveDeviceResponse>> {
    let conn = state.db.get()?;

    if !queries::remove_device(&conn, &identity.account_id, &fingerprint)? {
        return Err(AppError::NotFound("Device not found".into()));
    }

    tracing::info!(account_id = %identity.account_id, "Device removed");

    Ok(Json(RemoveDeviceResponse {
        success: true,
        devices_used: queries::list_devices(&conn, &identity.account_id)?.len(),
    }))
}
