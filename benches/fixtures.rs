use riskmc::{Dependencies, Dependency, RiskEvent, Scenario, Timeframe};

pub struct Shape {
    pub independent: usize,
    pub dependent: usize,
    pub edges_per_dependent: usize,
}

pub const SMALL: Shape = Shape { independent: 4, dependent: 2, edges_per_dependent: 1 };

pub const MEDIUM: Shape = Shape { independent: 20, dependent: 10, edges_per_dependent: 2 };

pub const LARGE: Shape = Shape { independent: 80, dependent: 40, edges_per_dependent: 3 };

/// Synthetic register: `independent` root events, then `dependent` events
/// each conditioned on `edges_per_dependent` roots. Every third root carries
/// a confidence std dev, every fifth is a cost-saving control.
pub fn build_scenario(shape: &Shape) -> Scenario {
    let timeframes = Timeframe::ALL;
    let mut events = Vec::with_capacity(shape.independent + shape.dependent);

    for i in 0..shape.independent {
        let lower = 0.05 + (i % 7) as f64 * 0.02;
        let mut event = RiskEvent::new(format!("root-{i}"), lower, lower + 0.1, timeframes[i % timeframes.len()])
            .with_impact(10_000.0 * (i + 1) as f64, 50_000.0 * (i + 1) as f64);
        if i % 3 == 0 {
            event = event.with_confidence(0.7, Some(0.05));
        }
        if i % 5 == 0 {
            event = event.with_implementation_cost(5_000.0, 20_000.0).cost_saving();
        }
        events.push(event);
    }

    let mut dependencies = Dependencies::new();
    for d in 0..shape.dependent {
        let name = format!("dep-{d}");
        events.push(RiskEvent::new(name.clone(), 0.2, 0.5, Timeframe::Yearly).with_impact(100_000.0, 400_000.0));
        let edges = (0..shape.edges_per_dependent)
            .map(|k| {
                let root = format!("root-{}", (d + k) % shape.independent);
                if k % 2 == 0 { Dependency::happens(root) } else { Dependency::not_happens(root) }
            })
            .collect();
        dependencies.insert(name, edges);
    }

    Scenario::new(events, dependencies)
}
