use async_trait::async_trait;
use readiness::knowledge::{AgentMapping, KnowledgeEntry, PhaseInfo};
use readiness::{
    CapabilityScore, DegradeReason, KnowledgeBase, ModelError, ModelRequest, PriorityCategory,
    ReportConfig, ReportGenerator, SynthesisConfig, SynthesisEvent, Synthesizer, TaskKey,
    TextModel,
};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Scripted model keyed on the capability named in the prompt.
#[derive(Default)]
struct StubModel {
    delays: HashMap<String, Duration>,
    panics_on: Vec<String>,
    hangs_on: Vec<String>,
    fail_all: Option<ModelError>,
    calls: Mutex<Vec<(Instant, String)>>,
    finished: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubModel {
    fn delay(mut self, capability: &str, delay: Duration) -> Self {
        self.delays.insert(capability.to_string(), delay);
        self
    }

    fn panic_on(mut self, capability: &str) -> Self {
        self.panics_on.push(capability.to_string());
        self
    }

    fn hang_on(mut self, capability: &str) -> Self {
        self.hangs_on.push(capability.to_string());
        self
    }

    fn fail_all(mut self, error: ModelError) -> Self {
        self.fail_all = Some(error);
        self
    }

    fn label(prompt: &str) -> String {
        prompt
            .lines()
            .find_map(|line| line.strip_prefix("CAPABILITY: "))
            .unwrap_or("executive")
            .to_string()
    }

    fn call_times(&self) -> Vec<Instant> {
        let mut times: Vec<Instant> = self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect();
        times.sort();
        times
    }
}

#[async_trait]
impl TextModel for StubModel {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let label = Self::label(&request.prompt);
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), label.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hangs_on.contains(&label) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(delay) = self.delays.get(&label) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.lock().unwrap().push(label.clone());

        if self.panics_on.contains(&label) {
            panic!("model blew up on {label}");
        }
        if let Some(error) = &self.fail_all {
            return Err(error.clone());
        }
        Ok(format!("Narrative for {label}."))
    }
}

fn entry(id: &str, name: &str, phase: &str) -> KnowledgeEntry {
    KnowledgeEntry {
        id: id.into(),
        name: name.into(),
        phase: PhaseInfo {
            id: phase.to_lowercase(),
            name: phase.into(),
            color: "#2E86AB".into(),
            agentic_goal: String::new(),
        },
        why_it_matters: Some(format!("{name} drives cash flow.")),
        agents: AgentMapping {
            primary_agents: vec!["Billing Operations Agent".into()],
            supporting_agents: Vec::new(),
        },
        ..Default::default()
    }
}

fn kb() -> Arc<KnowledgeBase> {
    Arc::new(KnowledgeBase::from_entries([
        entry("a", "Cap A", "Rate"),
        entry("b", "Cap B", "Rate"),
        entry("c", "Cap C", "Bill"),
        entry("d", "Cap D", "Bill"),
        entry("e", "Cap E", "Collect"),
        entry("s", "Cap S", "Collect"),
    ]))
}

fn generator(model: Arc<StubModel>, synthesis: SynthesisConfig, config: ReportConfig) -> ReportGenerator {
    ReportGenerator::new(Synthesizer::new(model, synthesis), kb()).with_config(config)
}

fn gap_scores() -> Vec<CapabilityScore> {
    vec![
        CapabilityScore::new("a", 9, 1),
        CapabilityScore::new("b", 9, 2),
        CapabilityScore::new("c", 8, 2),
        CapabilityScore::new("d", 8, 3),
    ]
}

fn headings(text: &str) -> Vec<&str> {
    text.lines().filter(|l| l.starts_with("### Cap")).collect()
}

fn without_timestamp(text: &str) -> String {
    text.lines()
        .filter(|l| !l.starts_with("*Generated:"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test(start_paused = true)]
async fn test_concrete_scenario() {
    let model = Arc::new(StubModel::default());
    let scores = vec![
        CapabilityScore::new("a", 9, 2),
        CapabilityScore::new("b", 8, 3),
        CapabilityScore::new("c", 2, 9),
    ];

    let report = generator(model.clone(), SynthesisConfig::default(), ReportConfig::default())
        .generate(&scores, "Acme")
        .await
        .unwrap();

    let keys: Vec<TaskKey> = report.sections.iter().map(|s| s.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            TaskKey::ExecutiveSummary,
            TaskKey::Gap("a".into()),
            TaskKey::Gap("b".into()),
        ]
    );
    assert!(report.text.contains("### Cap A\n**Phase:** Rate | **Scores:** I=9, R=2, Gap=7\n\nNarrative for Cap A."));
    assert!(report.text.contains("### Cap B\n**Phase:** Rate | **Scores:** I=8, R=3, Gap=6\n\nNarrative for Cap B."));
    assert!(report.text.contains("Narrative for executive."));
    assert_eq!(model.calls.lock().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_section_order_independent_of_completion_order() {
    // Most urgent gap is the slowest, least urgent finishes first.
    let slow_first = Arc::new(
        StubModel::default()
            .delay("Cap A", Duration::from_secs(8))
            .delay("Cap B", Duration::from_secs(6))
            .delay("Cap C", Duration::from_secs(4))
            .delay("Cap D", Duration::from_secs(1)),
    );
    let fast_first = Arc::new(
        StubModel::default()
            .delay("Cap A", Duration::from_secs(1))
            .delay("Cap D", Duration::from_secs(8)),
    );

    let first = generator(slow_first.clone(), SynthesisConfig::default(), ReportConfig::default())
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();
    let second = generator(fast_first, SynthesisConfig::default(), ReportConfig::default())
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    let finished = slow_first.finished.lock().unwrap().clone();
    let pos = |label: &str| finished.iter().position(|l| l == label).unwrap();
    assert!(pos("Cap D") < pos("Cap A"), "stub did not reverse completion order");

    assert_eq!(
        headings(&first.text),
        vec![
            "### Cap A",
            "### Cap B",
            "### Cap C",
            "### Cap D",
        ]
    );
    assert_eq!(without_timestamp(&first.text), without_timestamp(&second.text));
}

#[tokio::test(start_paused = true)]
async fn test_outbound_calls_are_spaced() {
    let model = Arc::new(StubModel::default());
    generator(model.clone(), SynthesisConfig::default(), ReportConfig::default())
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    let times = model.call_times();
    assert_eq!(times.len(), 5);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(500));
    }
}

#[tokio::test(start_paused = true)]
async fn test_worker_pool_is_bounded() {
    let model = Arc::new(
        ["Cap A", "Cap B", "Cap C", "Cap D"]
            .into_iter()
            .fold(StubModel::default(), |m, cap| m.delay(cap, Duration::from_secs(2))),
    );
    let synthesis = SynthesisConfig::default().min_interval(Duration::ZERO);

    generator(model.clone(), synthesis, ReportConfig::default().max_workers(2))
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    assert_eq!(model.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_model_outage_still_produces_complete_report() {
    let model = Arc::new(StubModel::default().fail_all(ModelError::Http { status: 503 }));

    let report = generator(model, SynthesisConfig::default(), ReportConfig::default())
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    assert_eq!(report.sections.len(), 5);
    assert_eq!(report.degraded_sections().count(), 5);
    assert!(report.text.contains("ASSESSMENT FOR: Acme"));
    assert!(report.text.contains("CAPABILITY: Cap A\nPHASE: Rate"));
    assert!(report.text.contains("## 4. Getting Started with Zuora MCP"));
    assert!(report.text.contains("## 5. Building Your First Agent"));
    assert_eq!(
        headings(&report.text),
        vec!["### Cap A", "### Cap B", "### Cap C", "### Cap D"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_outage_retries_each_task_once() {
    let model = Arc::new(StubModel::default().fail_all(ModelError::RateLimited));

    let report = generator(model.clone(), SynthesisConfig::default(), ReportConfig::default())
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    assert_eq!(model.calls.lock().unwrap().len(), 10);
    assert!(report
        .sections
        .iter()
        .all(|s| s.outcome.reason() == Some(&DegradeReason::RateLimited)));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_task_degrades_only_its_slot() {
    let model = Arc::new(StubModel::default().panic_on("Cap B"));

    let report = generator(model, SynthesisConfig::default(), ReportConfig::default())
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    let b = report.section(&TaskKey::Gap("b".into())).unwrap();
    assert!(matches!(b.reason(), Some(DegradeReason::TaskFailed(_))));
    assert!(b.text().starts_with("CAPABILITY: Cap B"));
    assert_eq!(report.degraded_sections().count(), 1);
    assert!(report.text.contains("Narrative for Cap A."));
    assert!(report.text.contains("Narrative for Cap C."));
    assert_eq!(
        headings(&report.text),
        vec!["### Cap A", "### Cap B", "### Cap C", "### Cap D"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_task_deadline_degrades_slot() {
    let model = Arc::new(StubModel::default().hang_on("Cap C"));
    let config = ReportConfig::default().task_timeout(Duration::from_secs(10));

    let report = generator(model, SynthesisConfig::default(), config)
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    let c = report.section(&TaskKey::Gap("c".into())).unwrap();
    assert_eq!(c.reason(), Some(&DegradeReason::Deadline(Duration::from_secs(10))));
    assert_eq!(report.degraded_sections().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_matrix_counts_retained_capabilities() {
    let model = Arc::new(StubModel::default());
    let scores = vec![
        CapabilityScore::new("a", 9, 1),
        CapabilityScore::new("b", 8, 6),
        CapabilityScore::new("s", 9, 9),
        CapabilityScore::new("e", 6, 8),
        CapabilityScore::new("unknown_cap", 9, 2),
        // Below 0.75 of the batch mean, filtered out
        CapabilityScore::new("c", 2, 2),
    ];

    let report = generator(model, SynthesisConfig::default(), ReportConfig::default())
        .generate(&scores, "Acme")
        .await
        .unwrap();

    let matrix = report.priority_matrix;
    assert_eq!(matrix.total(), report.capabilities.len());
    assert_eq!(matrix.total(), 5);
    assert_eq!(matrix.get(PriorityCategory::UrgentGap), 2);
    assert_eq!(matrix.get(PriorityCategory::CriticalGap), 1);
    assert_eq!(matrix.get(PriorityCategory::Strength), 1);
    assert_eq!(matrix.get(PriorityCategory::Maintain), 1);
    assert_eq!(matrix.get(PriorityCategory::Deprioritize), 0);

    // Unknown capabilities count but get no gap section.
    assert!(report.section(&TaskKey::Gap("unknown_cap".into())).is_none());
    assert!(report.text.contains("| 🔴 Urgent Gaps | 2 | High importance (≥7), Low readiness (≤4) |"));
}

#[tokio::test(start_paused = true)]
async fn test_max_urgent_sections_prefix() {
    let model = Arc::new(StubModel::default());
    let config = ReportConfig::default().max_urgent_sections(2);

    let report = generator(model, SynthesisConfig::default(), config)
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    assert_eq!(headings(&report.text), vec!["### Cap A", "### Cap B"]);
    // All four still count as urgent gaps in the matrix.
    assert_eq!(report.priority_matrix.get(PriorityCategory::UrgentGap), 4);
}

#[tokio::test(start_paused = true)]
async fn test_events_cover_every_task() {
    let model = Arc::new(StubModel::default());
    let synthesizer = Synthesizer::new(model, SynthesisConfig::default()).capture_events(true);
    let generator = ReportGenerator::new(synthesizer, kb());

    generator.generate(&gap_scores(), "Acme").await.unwrap();

    let events = generator.synthesizer().take_events();
    let starts = events
        .iter()
        .filter(|e| matches!(e, SynthesisEvent::TaskStart { .. }))
        .count();
    let finishes = events
        .iter()
        .filter(|e| matches!(e, SynthesisEvent::TaskFinish { degraded: false, .. }))
        .count();
    assert_eq!(starts, 5);
    assert_eq!(finishes, 5);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_agent_names_are_flagged() {
    struct Inventive;

    #[async_trait]
    impl TextModel for Inventive {
        async fn generate(&self, _: &ModelRequest) -> Result<String, ModelError> {
            Ok("the Billing Operations Agent pairs with the Cash Wizard Agent.".into())
        }
    }

    let synthesizer = Synthesizer::new(Arc::new(Inventive), SynthesisConfig::default());
    let report = ReportGenerator::new(synthesizer, kb())
        .generate(&gap_scores(), "Acme")
        .await
        .unwrap();

    assert_eq!(
        report.warnings,
        vec!["⚠️ Unknown agent referenced: 'Cash Wizard Agent'".to_string()]
    );
    assert!(report
        .text
        .ends_with("## Report Validation Warnings\n\n- ⚠️ Unknown agent referenced: 'Cash Wizard Agent'\n"));
}

#[tokio::test(start_paused = true)]
async fn test_report_from_knowledge_base_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r##"{{
  "phases": [
    {{
      "id": "invoice",
      "name": "Invoice",
      "color": "#2E86AB",
      "capabilities": [
        {{
          "id": "invoice_generation",
          "name": "Invoice Generation",
          "why_it_matters": "Invoices are cash.",
          "current_ai_capabilities": {{ "platform_features": ["Bill runs"], "mcp_tools": ["query_objects"] }},
          "agent_mapping": {{ "primary_agents": ["Billing Operations Agent"] }}
        }}
      ]
    }}
  ]
}}"##
    )
    .unwrap();

    let kb = Arc::new(tokio_test::assert_ok!(KnowledgeBase::from_path(file.path())));
    let model = Arc::new(StubModel::default());
    let report = ReportGenerator::new(Synthesizer::new(model.clone(), SynthesisConfig::default()), kb)
        .generate(&[CapabilityScore::new("invoice_generation", 9, 2)], "Acme")
        .await
        .unwrap();

    assert!(report.text.contains("### Invoice Generation\n**Phase:** Invoice"));
    assert!(model
        .calls
        .lock()
        .unwrap()
        .iter()
        .any(|(_, label)| label == "Invoice Generation"));
}
