//! MiOS account handlers.

use tabled::Tabled;
use verasync_core::session::{account_session, select_device};
use verasync_core::{AccountDevice, DeviceInfo, HubConfig};

use crate::cli::{CloudArgs, CloudCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util::opt_or_dash;

#[derive(Tabled)]
struct AccountDeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Blocked")]
    blocked: bool,
}

impl From<&AccountDevice> for AccountDeviceRow {
    fn from(d: &AccountDevice) -> Self {
        Self {
            id: d.device_id.clone(),
            name: d.name.clone(),
            mac: d.mac_address.clone(),
            server: d.server_device.clone(),
            blocked: d.blocked,
        }
    }
}

fn info_detail(i: &DeviceInfo) -> String {
    [
        format!("ID:          {}", i.device_id),
        format!("Platform:    {}", i.platform),
        format!("Firmware:    {}", i.firmware_version),
        format!("UI version:  {}", i.ui_version),
        format!(
            "Reached via: {}",
            if i.uses_relay() {
                format!("relay {}", opt_or_dash(i.server_relay.as_deref()))
            } else {
                "legacy forwarder".into()
            }
        ),
        format!("Internal IP: {}", i.internal_ip),
        format!("External IP: {}", i.external_ip),
        format!("MAC:         {}", i.mac_address),
        format!("Timezone:    {}", i.timezone),
    ]
    .join("\n")
}

pub async fn handle(
    config: &HubConfig,
    args: CloudArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let session = account_session(config).await?;
    let devices = session
        .list_devices()
        .await
        .map_err(verasync_core::CoreError::from)?;

    match args.command {
        CloudCommand::Devices => {
            let out = output::render_list(
                &global.output,
                &devices,
                |d| AccountDeviceRow::from(d),
                |d| d.device_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CloudCommand::Info { device } => {
            let hub = select_device(&devices, Some(&device))?;
            let info = session
                .device_info(hub)
                .await
                .map_err(verasync_core::CoreError::from)?;
            let out =
                output::render_single(&global.output, &info, info_detail, |i| i.device_id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
