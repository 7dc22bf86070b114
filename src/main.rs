mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bufneg::capability_set::derive_capabilities;
use bufneg::device::Device;
use bufneg::drivers::pitch_linear::{PitchLinearDriver, PitchLinearProperties};
use bufneg::usage::{Assertion, DeviceId, RotationMask, UsageAtom, UsageDescriptor};

fn main() -> Result<()> {
    let args = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    info!("We're up!");

    let gpu = Device::from_driver(
        DeviceId(0),
        Box::new(PitchLinearDriver::new(PitchLinearProperties::modern())),
    );
    let display = Device::from_driver(
        DeviceId(1),
        Box::new(PitchLinearDriver::new(PitchLinearProperties::legacy())),
    );

    let assertion = Assertion::new(args.width, args.height, None);

    let mut uses = vec![UsageAtom {
        dev: None,
        usage: UsageDescriptor::Texture,
    }];
    if args.display {
        uses.push(UsageAtom {
            dev: Some(DeviceId(1)),
            usage: UsageDescriptor::Display {
                rotation: RotationMask(RotationMask::ROTATION_0),
            },
        });
    }

    let gpu_sets = gpu
        .get_capabilities(&assertion, &uses)
        .context("GPU device rejected capability query")?;
    let display_sets = display
        .get_capabilities(&assertion, &uses)
        .context("display device rejected capability query")?;

    let negotiated = derive_capabilities(&gpu_sets, &display_sets);

    let Some(winner) = negotiated.first() else {
        info!("no compatible capability set found between devices");
        return Ok(());
    };

    info!(
        constraints = winner.constraints().len(),
        capabilities = winner.capabilities().len(),
        "negotiated capability set"
    );

    let allocation = gpu
        .create_allocation(&assertion, winner)
        .context("failed to create allocation on GPU device")?;

    let (metadata, handle, size) = gpu
        .export_allocation(&allocation)
        .context("failed to export allocation")?;

    info!(
        size,
        handle = handle.0,
        metadata_bytes = metadata.len(),
        "exported allocation"
    );

    Ok(())
}
