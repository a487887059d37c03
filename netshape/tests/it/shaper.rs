use std::{io, sync::Arc};

use netshape::{
    command::{self, Output, ShellRunner},
    ifb::Provisioning,
    route::InterfaceError,
    Error, NetworkShaper, Outcome, Profile, ShapingConfig,
};

use crate::kernel::FakeKernel;

fn shaper(kernel: &Arc<FakeKernel>) -> NetworkShaper<Arc<FakeKernel>, Arc<FakeKernel>> {
    let _ = tracing_subscriber::fmt::try_init();
    NetworkShaper::new(Arc::clone(kernel), Arc::clone(kernel))
}

#[tokio::test]
async fn start_shapes_both_directions() {
    let kernel = Arc::new(FakeKernel::host());
    let shaper = shaper(&kernel);

    let setup = shaper.start(&Profile::ThreeG.config()).await.unwrap();

    assert_eq!(setup.interface, "eth0");
    assert_eq!(setup.provisioning, Provisioning { module: Outcome::Done, link: None });
    assert_eq!(kernel.root("eth0").as_deref(), Some("delay 75ms rate 768kbit limit 60"));
    assert_eq!(kernel.root("ifb0").as_deref(), Some("delay 75ms rate 1600kbit limit 65"));
    assert!(kernel.has_ingress("eth0"));
    assert_eq!(kernel.filters("eth0"), 1);
}

#[tokio::test]
async fn start_runs_the_expected_sequence() {
    let kernel = Arc::new(FakeKernel::host());
    let config = ShapingConfig::default().with_up(330).with_down(780).with_rtt(200.0);

    shaper(&kernel).start(&config).await.unwrap();

    assert_eq!(
        kernel.log(),
        [
            "tc qdisc del dev eth0 root",
            "tc qdisc del dev eth0 ingress",
            "tc qdisc del dev ifb0 root",
            "modprobe ifb",
            "ip link set dev ifb0 up",
            "tc qdisc add dev eth0 ingress",
            concat!(
                "tc filter add dev eth0 parent ffff: protocol ip u32 match u32 0 0 flowid 1:1 ",
                "action mirred egress redirect dev ifb0"
            ),
            "tc qdisc add dev ifb0 root handle 1:0 netem delay 100ms rate 780kbit limit 60",
            "tc qdisc add dev eth0 root handle 1:0 netem delay 100ms rate 330kbit limit 60",
        ]
    );
}

#[tokio::test]
async fn restart_replaces_previous_shaping() {
    let kernel = Arc::new(FakeKernel::host());
    let shaper = shaper(&kernel);

    shaper.start(&Profile::ThreeG.config()).await.unwrap();
    let setup = shaper.start(&Profile::Cable.config()).await.unwrap();

    assert!(setup.cleanup.is_clean());
    assert_eq!(setup.cleanup.root, Outcome::Done);
    assert_eq!(setup.cleanup.ingress, Outcome::Done);
    assert_eq!(setup.cleanup.ifb_root, Outcome::Done);

    assert_eq!(kernel.root("eth0").as_deref(), Some("delay 7ms rate 1000kbit limit 60"));
    assert_eq!(kernel.root("ifb0").as_deref(), Some("delay 7ms rate 5000kbit limit 60"));
    assert_eq!(kernel.filters("eth0"), 1);
}

#[tokio::test]
async fn stop_on_unshaped_system_is_a_no_op() {
    let kernel = Arc::new(FakeKernel::host());
    let teardown = shaper(&kernel).stop().await;

    assert_eq!(teardown.interface.as_deref(), Some("eth0"));
    assert_eq!(teardown.root, Outcome::NotFound);
    assert_eq!(teardown.ingress, Outcome::NotFound);
    // ifb0 does not even exist yet.
    assert_eq!(teardown.ifb_root, Outcome::NotFound);
    assert!(teardown.is_clean());
    assert!(kernel.is_pristine());
}

#[tokio::test]
async fn stop_removes_everything() {
    let kernel = Arc::new(FakeKernel::host());
    let shaper = shaper(&kernel);

    shaper.start(&Profile::Lte.config()).await.unwrap();
    let teardown = shaper.stop().await;

    assert!(teardown.is_clean());
    assert!(kernel.is_pristine());
}

#[tokio::test]
async fn stop_cleans_partial_configuration() {
    let kernel = Arc::new(FakeKernel::host());
    let shaper = shaper(&kernel);
    kernel.fail("tc qdisc add dev eth0 root", "RTNETLINK answers: Operation not permitted\n");

    let err = shaper.start(&Profile::Dsl.config()).await.unwrap_err();
    assert!(matches!(err, Error::Command(_)), "{err}");

    // Ingress redirection and the download qdisc made it in before the failure.
    assert!(kernel.has_ingress("eth0"));
    assert!(kernel.root("ifb0").is_some());
    assert!(kernel.root("eth0").is_none());

    kernel.clear_failures();
    let teardown = shaper.stop().await;

    assert_eq!(teardown.root, Outcome::NotFound);
    assert_eq!(teardown.ingress, Outcome::Done);
    assert_eq!(teardown.ifb_root, Outcome::Done);
    assert!(kernel.is_pristine());
}

#[tokio::test]
async fn stop_swallows_genuine_errors() {
    let kernel = Arc::new(FakeKernel::host());
    let shaper = shaper(&kernel);
    shaper.start(&Profile::FourG.config()).await.unwrap();

    kernel.fail("tc qdisc del", "sudo: a password is required\n");
    let teardown = shaper.stop().await;

    assert_eq!(teardown.root, Outcome::Failed("sudo: a password is required".into()));
    assert_eq!(teardown.ingress, Outcome::Failed("sudo: a password is required".into()));
    assert!(!teardown.is_clean());
}

#[tokio::test]
async fn stop_without_default_route_still_clears_ifb() {
    let kernel = Arc::new(FakeKernel::host());
    let shaper = shaper(&kernel);
    shaper.start(&ShapingConfig::default().with_down(1000)).await.unwrap();

    {
        let mut state = kernel.state.lock().unwrap();
        state.default_route = None;
        state.route_stderr = "Error: ipv4: FIB table does not exist.\n".into();
    }
    kernel.clear_log();

    let teardown = shaper.stop().await;

    assert_eq!(teardown.interface, None);
    assert!(matches!(teardown.root, Outcome::Failed(_)));
    assert_eq!(teardown.ingress, Outcome::Skipped);
    assert_eq!(teardown.ifb_root, Outcome::Done);
    assert_eq!(kernel.log(), ["tc qdisc del dev ifb0 root"]);
}

/// A shell that cannot be spawned at all.
struct MissingShell;

#[async_trait::async_trait]
impl ShellRunner for MissingShell {
    async fn shell(&self, _script: &str) -> command::Result<Output> {
        Err(io::Error::new(io::ErrorKind::NotFound, "sh: not found").into())
    }
}

#[tokio::test]
async fn stop_clears_ifb_when_the_shell_cannot_run() {
    let kernel = Arc::new(FakeKernel::host());
    shaper(&kernel).start(&ShapingConfig::default().with_down(1000)).await.unwrap();
    kernel.clear_log();

    let teardown = NetworkShaper::new(Arc::clone(&kernel), MissingShell).stop().await;

    assert_eq!(teardown.interface, None);
    assert!(
        matches!(teardown.root, Outcome::Failed(ref msg) if msg.contains("sh: not found")),
        "{:?}",
        teardown.root
    );
    assert_eq!(teardown.ingress, Outcome::Skipped);
    assert_eq!(teardown.ifb_root, Outcome::Done);
    assert!(!teardown.is_clean());
    assert_eq!(kernel.log(), ["tc qdisc del dev ifb0 root"]);
    assert!(kernel.root("ifb0").is_none());
}

#[tokio::test]
async fn start_fails_without_default_route() {
    let kernel = Arc::new(FakeKernel::host());
    {
        let mut state = kernel.state.lock().unwrap();
        state.default_route = None;
        state.route_stderr = "Cannot open netlink socket: Permission denied\n".into();
    }

    let err = shaper(&kernel).start(&Profile::ThreeG.config()).await.unwrap_err();

    assert!(matches!(err, Error::Interface(InterfaceError::Query(_))), "{err}");
    assert!(kernel.is_pristine());
}

#[tokio::test]
async fn latency_only_goes_both_ways() {
    let kernel = Arc::new(FakeKernel::host());

    shaper(&kernel).start(&ShapingConfig::default().with_rtt(100.0)).await.unwrap();

    assert_eq!(kernel.root("eth0").as_deref(), Some("delay 50ms"));
    assert_eq!(kernel.root("ifb0").as_deref(), Some("delay 50ms"));
}

#[tokio::test]
async fn zero_loss_is_not_passed_to_tc() {
    let kernel = Arc::new(FakeKernel::host());
    let shaper = shaper(&kernel);

    shaper.start(&Profile::ThreeG.config().with_packet_loss(0.0)).await.unwrap();
    assert!(kernel.log().iter().all(|line| !line.contains("loss")));

    shaper.start(&Profile::ThreeG.config().with_packet_loss(1.5)).await.unwrap();
    assert!(kernel.root("eth0").unwrap().ends_with("loss 1.5%"));
    assert!(kernel.root("ifb0").unwrap().ends_with("loss 1.5%"));
}

#[tokio::test]
async fn container_creates_ifb_link_once() {
    let kernel = Arc::new(FakeKernel::container());
    let shaper = shaper(&kernel);

    let first = shaper.start(&Profile::ThreeG.config()).await.unwrap();
    assert!(matches!(first.provisioning.module, Outcome::Failed(_)));
    assert_eq!(first.provisioning.link, Some(Outcome::Done));

    let second = shaper.start(&Profile::ThreeG.config()).await.unwrap();
    assert_eq!(second.provisioning.link, Some(Outcome::Exists));
    assert!(kernel.root("ifb0").is_some());
}

#[tokio::test]
async fn invalid_config_touches_nothing() {
    let kernel = Arc::new(FakeKernel::host());

    let err = shaper(&kernel).start(&ShapingConfig::default().with_rtt(-5.0)).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(kernel.log().is_empty());
}
