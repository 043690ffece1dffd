//! Host-side boot staging driver.
//!
//! Plays the part of the loader's boot sequence: describes each payload from
//! its "header", has the registry unpack it into simulated RAM, runs the
//! verification sweep and prints what the next stage would be handed.

mod arena;

use std::fmt;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::{eyre, WrapErr};
use log::{error, info, LevelFilter};

use shared::images::{
    ImageRegistry, ImageTag, RuntimeAttrs, SweepPolicy, DEFAULT_LAYOUT, VERIFIED_LAYOUT,
};
use shared::log::LogSink;
use shared::memory::{Length, PhysAddress};

use arena::Arena;

#[derive(Parser, Debug)]
struct Args {
    /// Kernel image
    #[arg(long)]
    linux: Option<PathBuf>,
    #[arg(long)]
    initramfs: Option<PathBuf>,
    /// Flattened device tree blob
    #[arg(long)]
    dtb: Option<PathBuf>,
    /// Kernel command line
    #[arg(long)]
    cmdline: Option<String>,
    /// USB controller firmware
    #[arg(long)]
    usbfw: Option<PathBuf>,
    /// Baseband processor loader
    #[arg(long)]
    bploader: Option<PathBuf>,
    /// Baseband processor firmware; may be left out
    #[arg(long)]
    bpfw: Option<PathBuf>,

    /// Checksum every payload during the sweep
    #[arg(long)]
    verify: bool,
    /// Fail payloads that were described but never finished
    #[arg(long)]
    strict: bool,
    /// Flip a byte in this payload after staging it
    #[arg(long, value_parser = parse_tag)]
    corrupt: Option<ImageTag>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn parse_tag(s: &str) -> Result<ImageTag, String> {
    if let Ok(raw) = s.parse::<u8>() {
        return ImageTag::from_raw(raw).ok_or_else(|| format!("no payload tag {}", raw));
    }
    ImageTag::ALL
        .into_iter()
        .find(|tag| tag.name() == s)
        .ok_or_else(|| format!("unknown payload {:?}", s))
}

/// `fmt::Write` over stderr for the log sink.
struct Stderr;

impl fmt::Write for Stderr {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        eprint!("{}", s);
        Ok(())
    }
}

impl Args {
    fn payloads(&self) -> eyre::Result<Vec<(ImageTag, Vec<u8>)>> {
        let files = [
            (ImageTag::Linux, &self.linux),
            (ImageTag::Initramfs, &self.initramfs),
            (ImageTag::FlatTree, &self.dtb),
            (ImageTag::UsbFirmware, &self.usbfw),
            (ImageTag::BpLoader, &self.bploader),
            (ImageTag::BpFirmware, &self.bpfw),
        ];

        let mut payloads = Vec::new();
        for (tag, path) in files {
            if let Some(path) = path {
                let bytes = fs::read(path)
                    .wrap_err_with(|| format!("reading {} from {}", tag, path.display()))?;
                payloads.push((tag, bytes));
            }
        }
        if let Some(cmdline) = &self.cmdline {
            let mut bytes = cmdline.clone().into_bytes();
            bytes.push(0);
            payloads.push((ImageTag::Cmdline, bytes));
        }
        payloads.sort_by_key(|(tag, _)| *tag);
        Ok(payloads)
    }
}

/// Flips the middle byte of a staged payload.
fn corrupt_payload(
    registry: &ImageRegistry,
    arena: &mut Arena,
    tag: ImageTag,
) -> eyre::Result<PhysAddress> {
    let view = match registry.find(tag) {
        Ok(view) if view.length().as_raw() > 0 => view,
        _ => return Err(eyre!("cannot corrupt {}: not staged", tag)),
    };
    let middle = PhysAddress::from_raw(view.address().as_raw() + view.length().as_raw() / 2);
    if !arena.corrupt(middle) {
        return Err(eyre!(
            "cannot corrupt {}: {:#x} is not backed by RAM",
            tag,
            middle.as_raw()
        ));
    }
    Ok(middle)
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    log::set_boxed_logger(Box::new(LogSink::new(Stderr, args.log_level)))
        .map_err(|e| eyre!("installing logger: {}", e))?;
    log::set_max_level(args.log_level);

    let layout = if args.verify {
        VERIFIED_LAYOUT
    } else {
        DEFAULT_LAYOUT
    };
    let policy = if args.strict {
        SweepPolicy::Strict
    } else {
        SweepPolicy::default()
    };

    let mut registry = ImageRegistry::new(layout);
    let mut arena = Arena::new(&layout);

    // Header step: sizes and checksums are known before any bytes move.
    let payloads = args.payloads()?;
    let mut described = Vec::new();
    for (tag, bytes) in payloads {
        let size = Length::from_raw(bytes.len() as u64);
        match registry.create(tag, size, crc32fast::hash(&bytes), RuntimeAttrs::empty()) {
            Ok(()) => {
                arena.feed(tag, bytes);
                described.push(tag);
            }
            Err(e) => error!("{}: {:#x} bytes refused: {}", tag, size.as_raw(), e),
        }
    }

    for tag in described {
        let window = arena.window(tag);
        match registry.unpack(tag, window, &mut arena) {
            Ok(view) => info!(
                "{}: staged {:#x} bytes at {:#x}",
                tag,
                view.length().as_raw(),
                view.address().as_raw()
            ),
            Err(e) => error!("{}: {}", tag, e),
        }
    }

    if let Some(tag) = args.corrupt {
        let address = corrupt_payload(&registry, &mut arena, tag)?;
        info!("{}: corrupted byte at {:#x}", tag, address.as_raw());
    }

    let summary = registry.complete(&arena, policy);

    let mut report = String::new();
    registry.dump_stats(&mut report)?;
    print!("{}", report);

    let handoff = registry.handoff();
    for tag in ImageTag::ALL {
        if let Some(extent) = handoff.get(tag) {
            println!(
                "handoff {:<9} {:08x} {:08x}",
                tag.name(),
                extent.address(),
                extent.length()
            );
        }
    }

    if let Err(e) = registry.check(ImageTag::Linux) {
        return Err(eyre!("no usable kernel: {}", e));
    }
    if !summary.is_bootable() {
        return Err(eyre!("staged payloads are not bootable: {:?}", summary));
    }
    Ok(())
}
