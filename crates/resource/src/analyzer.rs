//! Analysis facade: build the graph for a set of roots and report problems.

use crate::config::AnalyzerConfig;
use crate::graph::{ResourceGraph, Root};

/// Runs one analysis pass per call and logs what it finds.
///
/// Every diagnostic of a pass is logged at `error` level before `analyze`
/// returns, so a user sees all wiring problems at once. Whether to proceed
/// is the caller's decision; [`ResourceGraph::into_result`] refuses a graph
/// with errors.
#[derive(Debug, Clone, Default)]
pub struct DependencyAnalyzer {
    config: AnalyzerConfig,
}

impl DependencyAnalyzer {
    /// Create an analyzer with the given settings.
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyze `roots` synchronously.
    pub fn analyze(&self, roots: &[Root]) -> ResourceGraph {
        let graph = ResourceGraph::build(roots);

        tracing::debug!(
            roots = roots.len(),
            nodes = graph.len(),
            components = graph.components().len(),
            "Resource dependency analysis complete"
        );

        for diagnostic in graph.diagnostics() {
            tracing::error!("{diagnostic}");
        }

        if self.config.report_unset_resources {
            report_unset(&graph);
        }

        graph
    }
}

/// Warn once per unset slot: per root reference, or per resource declaring
/// the member when no root references it.
fn report_unset(graph: &ResourceGraph) {
    for node in graph.nodes().iter().filter(|n| n.is_placeholder()) {
        for reference in node.references() {
            tracing::warn!(
                member = %reference.member(),
                instance = reference.instance().type_name(),
                "Resource setting is not set"
            );
        }

        if !node.references().is_empty() {
            continue;
        }
        let Some(member) = node.depender() else {
            continue;
        };
        for dependent in graph.direct_dependents(node.id()) {
            tracing::warn!(
                member = %member,
                resource = %dependent.display_name(),
                "Resource setting is not set"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::Diagnostic;
    use crate::member::Reflect;
    use crate::member::OpenBehavior;
    use crate::testing::{TestResource, TestStep};
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `analyze` under a subscriber that records formatted events.
    fn analyze_logged(analyzer: &DependencyAnalyzer, roots: &[Root]) -> (ResourceGraph, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let graph = tracing::subscriber::with_default(subscriber, || analyzer.analyze(roots));
        let output = String::from_utf8_lossy(&captured.0.lock()).into_owned();
        (graph, output)
    }

    fn warnings(output: &str) -> Vec<&str> {
        output
            .lines()
            .filter(|line| line.contains("Resource setting is not set"))
            .collect()
    }

    #[test]
    fn reports_every_problem_in_one_pass() {
        let a = TestResource::new("A");
        let b = TestResource::new("B");
        let c = TestResource::new("C");
        a.depends_on("Next", &b.handle());
        b.depends_on("Next", &a.handle());
        c.depends_on("Me", &c.handle());

        let graph = DependencyAnalyzer::default()
            .analyze(&[Root::from(a.handle()), Root::from(c.handle())]);

        assert!(graph.errors_detected());
        let diagnostics = graph.diagnostics();
        assert!(diagnostics.contains(&Diagnostic::SelfReference {
            resource: "C".into()
        }));
        assert!(diagnostics.contains(&Diagnostic::CircularReference {
            resources: vec!["A".into(), "B".into()]
        }));
    }

    #[test]
    fn unset_reporting_does_not_make_errors() {
        let step: Arc<dyn Reflect> =
            Arc::new(TestStep::new("Measure").with_resource("Meter", None));
        let analyzer = DependencyAnalyzer::new(AnalyzerConfig {
            report_unset_resources: true,
        });

        let graph = analyzer.analyze(&[Root::from(step)]);
        assert!(!graph.errors_detected());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn every_diagnostic_is_logged_before_returning() {
        let a = TestResource::new("A");
        let b = TestResource::new("B");
        let c = TestResource::new("C");
        a.depends_on("Next", &b.handle());
        b.depends_on("Next", &a.handle());
        c.depends_on("Me", &c.handle());

        let (graph, output) = analyze_logged(
            &DependencyAnalyzer::default(),
            &[Root::from(a.handle()), Root::from(c.handle())],
        );

        let errors: Vec<&str> = output.lines().filter(|l| l.contains("ERROR")).collect();
        assert_eq!(errors.len(), graph.diagnostics().len());
        for diagnostic in graph.diagnostics() {
            let message = diagnostic.to_string();
            assert!(
                errors.iter().any(|line| line.ends_with(&message)),
                "missing `{message}` in:\n{output}"
            );
        }
    }

    #[test]
    fn clean_graph_logs_no_errors() {
        let a = TestResource::new("A");
        let b = TestResource::new("B");
        a.depends_on("Next", &b.handle());

        let (graph, output) =
            analyze_logged(&DependencyAnalyzer::default(), &[Root::from(a.handle())]);

        assert!(!graph.errors_detected());
        assert!(!output.contains("ERROR"));
    }

    #[test]
    fn unset_slot_of_step_is_warned() {
        let step: Arc<dyn Reflect> =
            Arc::new(TestStep::new("Measure").with_resource("Meter", None));

        let (_, output) = analyze_logged(&DependencyAnalyzer::default(), &[Root::from(step)]);

        let warnings = warnings(&output);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("member=Measure.Meter"));
        assert!(warnings[0].contains("instance="));
    }

    #[test]
    fn unset_slot_of_referenced_instrument_is_warned() {
        let dmm = TestResource::new("DMM");
        dmm.set_dependency("Bus", None, OpenBehavior::Before);
        let step: Arc<dyn Reflect> =
            Arc::new(TestStep::new("Measure").with_resource("Meter", Some(dmm.handle())));

        let (graph, output) = analyze_logged(&DependencyAnalyzer::default(), &[Root::from(step)]);

        let placeholder = graph
            .nodes()
            .iter()
            .find(|node| node.is_placeholder())
            .unwrap();
        assert!(placeholder.references().is_empty());

        let warnings = warnings(&output);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("member=DMM.Bus"));
        assert!(warnings[0].contains("resource=DMM"));
    }

    #[test]
    fn unset_reporting_can_be_disabled() {
        let dmm = TestResource::new("DMM");
        dmm.set_dependency("Bus", None, OpenBehavior::Before);
        let step: Arc<dyn Reflect> = Arc::new(
            TestStep::new("Measure")
                .with_resource("Meter", Some(dmm.handle()))
                .with_resource("Scope", None),
        );
        let analyzer = DependencyAnalyzer::new(AnalyzerConfig {
            report_unset_resources: false,
        });

        let (_, output) = analyze_logged(&analyzer, &[Root::from(step)]);

        assert!(warnings(&output).is_empty());
    }
}
