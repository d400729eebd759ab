// Bench session example: analyze a small test plan, take a lock around
// opening its instruments, then release it after closing.
//
// Run with `TAPLOCK_LOG=debug` to see the hook dispatch.

use std::sync::Arc;

use taplock_resource::testing::{RecordingHook, TestResource, TestStep};
use taplock_resource::{
    AuditHook, DependencyAnalyzer, LockHook, LockManager, OpenBehavior, Reflect, Root,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = taplock_log::init()?;

    // -- Instruments --------------------------------------------------------

    let psu = TestResource::new("PSU");
    let dut = TestResource::new("DUT");
    let scope = TestResource::new("Scope");
    dut.depends_on("Supply", &psu.handle());
    scope.set_dependency("Trigger", Some(dut.handle()), OpenBehavior::InParallel);

    // -- Test plan ----------------------------------------------------------

    let measure: Arc<dyn Reflect> = Arc::new(
        TestStep::new("MeasureCurrent")
            .with_resource("Dut", Some(dut.handle()))
            .with_resource("Scope", Some(scope.handle())),
    );

    let graph = DependencyAnalyzer::default()
        .analyze(&[Root::from(measure)])
        .into_result()?;
    println!("{} resources", graph.len());

    // -- Open / close -------------------------------------------------------

    let log = RecordingHook::shared_log();
    let locks = LockManager::new(vec![
        Arc::new(AuditHook) as Arc<dyn LockHook>,
        RecordingHook::new("bench-lock", 0, &log),
    ]);
    let cancel = CancellationToken::new();

    locks.before_open(graph.nodes(), &cancel).await?;
    for (i, level) in graph.open_order()?.iter().enumerate() {
        let names: Vec<String> = level.iter().map(ToString::to_string).collect();
        println!("open level {i}: {}", names.join(", "));
    }
    for (i, level) in graph.close_order()?.iter().enumerate() {
        let names: Vec<String> = level.iter().map(ToString::to_string).collect();
        println!("close level {i}: {}", names.join(", "));
    }
    locks.after_close(graph.nodes(), &cancel).await?;

    println!("hook calls: {:?}", RecordingHook::calls(&log));
    Ok(())
}
