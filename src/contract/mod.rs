//! The call surface of the registry as seen by the execution environment.
//!
//! Function names and argument order follow the deployed contract
//! (`register-track`, `transfer-track`, `update-license`, `get-track-info`),
//! and results are rendered as Clarity values.

pub mod call;
pub mod value;

pub use call::{CallError, ContractCall};
pub use value::Value;

use crate::{
    domain::{principal::Principal, track::Track},
    registry::{error::RegistryError, operations::Registry},
};

/// Applies `call` on behalf of `sender` and returns its receipt.
///
/// Contract-level failures become `(err uN)` receipts, only storage failures are returned as errors.
pub fn execute(
    registry: &mut Registry,
    sender: &Principal,
    call: ContractCall,
) -> Result<Value, RegistryError> {
    log::debug!("{sender} calls {}", call.function_name());

    let outcome = match call {
        ContractCall::RegisterTrack {
            title,
            artist,
            license_type,
            price,
        } => registry
            .register(sender, &title, &artist, &license_type, price)
            .map(|id| Value::UInt(id.0)),

        ContractCall::TransferTrack { id, new_owner } => registry
            .transfer(sender, id, &new_owner)
            .map(|()| Value::Bool(true)),

        ContractCall::UpdateLicense {
            id,
            license_type,
            price,
        } => registry
            .update_license(sender, id, &license_type, price)
            .map(|()| Value::Bool(true)),

        ContractCall::GetTrackInfo { id } => {
            return Ok(match registry.get_track_info(id)? {
                Some(track) => Value::some(track_tuple(&track)),
                None => Value::None,
            });
        }
    };

    match outcome {
        Ok(value) => Ok(Value::ok(value)),
        Err(err) => match err.code() {
            Some(code) => Ok(Value::err(Value::UInt(code.into()))),
            None => Err(err),
        },
    }
}

/// Tuple returned by `get-track-info`
pub fn track_tuple(track: &Track) -> Value {
    Value::Tuple(vec![
        ("artist", Value::Ascii(track.artist.clone())),
        (
            "license-type",
            Value::Ascii(track.license.license_type.clone()),
        ),
        ("owner", Value::Principal(track.owner.clone())),
        ("price", Value::UInt(track.license.price)),
        ("title", Value::Ascii(track.title.clone())),
    ])
}
