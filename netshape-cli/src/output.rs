//! Human-readable summaries printed after each command.

use netshape::{ifb::IFB_DEVICE, Outcome, Profile, Setup, ShapingConfig, Teardown};

fn rate(kbit: Option<std::num::NonZeroU32>) -> String {
    kbit.map(|kbit| format!("{kbit} kbit/s")).unwrap_or_else(|| "uncapped".to_string())
}

pub fn print_setup(setup: &Setup, config: &ShapingConfig) {
    println!("shaping {} (download via {IFB_DEVICE})", setup.interface);
    println!("  up:     {}", rate(config.up));
    println!("  down:   {}", rate(config.down));
    println!("  rtt:    {} ms", config.rtt);
    if config.packet_loss > 0.0 {
        println!("  loss:   {}%", config.packet_loss);
    }
    if let Some(Outcome::Failed(reason)) = &setup.provisioning.link {
        println!("  note:   could not create {IFB_DEVICE}: {reason}");
    }
}

pub fn print_teardown(teardown: &Teardown) {
    match &teardown.interface {
        Some(interface) => {
            println!("{interface} root:    {}", teardown.root);
            println!("{interface} ingress: {}", teardown.ingress);
        }
        None => println!("default interface: {}", teardown.root),
    }
    println!("{IFB_DEVICE} root:    {}", teardown.ifb_root);
}

pub fn profile_row(profile: Profile) -> String {
    let config = profile.config();
    let kbit = |rate: Option<std::num::NonZeroU32>| rate.map_or(0, |rate| rate.get());

    format!(
        "{:<8} {:>8} {:>8} {:>6}",
        profile.name(),
        kbit(config.up),
        kbit(config.down),
        config.rtt
    )
}
