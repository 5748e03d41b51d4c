//! Mixed workflow: components drawn independently per iteration

use crate::error::Result;
use crate::workflow::Workflow;
use crate::{ingestion, inventory, locate, position, short_sell};
use surge_config::{MixedConfig, ScenarioKind};

pub fn component_probabilities(config: &MixedConfig) -> [(ScenarioKind, f64); 5] {
    [
        (ScenarioKind::Locate, config.locate),
        (ScenarioKind::ShortSell, config.short_sell),
        (ScenarioKind::Position, config.position),
        (ScenarioKind::Inventory, config.inventory),
        (ScenarioKind::DataIngestion, config.data_ingestion),
    ]
}

/// Components whose draw fell under their probability, in declaration order.
/// Never empty: with no hit the most likely component runs alone.
pub fn select_components(config: &MixedConfig, draws: [f64; 5]) -> Vec<ScenarioKind> {
    let components = component_probabilities(config);
    let selected: Vec<_> = components
        .iter()
        .zip(draws)
        .filter(|((_, p), draw)| *draw < *p)
        .map(|((kind, _), _)| *kind)
        .collect();
    if !selected.is_empty() {
        return selected;
    }

    let mut fallback = components[0];
    for candidate in &components[1..] {
        if candidate.1 > fallback.1 {
            fallback = *candidate;
        }
    }
    vec![fallback.0]
}

pub async fn run(wf: &mut Workflow<'_>) -> Result<()> {
    let mixed = wf.ctx().mix.mixed;
    let draws = [wf.draw(), wf.draw(), wf.draw(), wf.draw(), wf.draw()];
    let components = select_components(&mixed, draws);

    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            wf.think().await;
        }
        match component {
            ScenarioKind::Locate => locate::run(wf).await?,
            ScenarioKind::ShortSell => short_sell::run(wf).await?,
            ScenarioKind::Position => position::run(wf).await?,
            ScenarioKind::Inventory => inventory::run(wf).await?,
            ScenarioKind::DataIngestion => ingestion::run(wf).await?,
            ScenarioKind::Mixed => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_every_hit() {
        let config = MixedConfig::default();
        let picked = select_components(&config, [0.1, 0.1, 0.9, 0.9, 0.1]);
        assert_eq!(
            picked,
            vec![ScenarioKind::Locate, ScenarioKind::ShortSell, ScenarioKind::DataIngestion]
        );
    }

    #[test]
    fn test_falls_back_to_most_likely() {
        let config = MixedConfig::default();
        let picked = select_components(&config, [0.99; 5]);
        assert_eq!(picked, vec![ScenarioKind::ShortSell]);

        let zero = MixedConfig {
            locate: 0.0,
            short_sell: 0.0,
            position: 0.0,
            inventory: 0.0,
            data_ingestion: 0.0,
        };
        assert_eq!(select_components(&zero, [0.0; 5]), vec![ScenarioKind::Locate]);
    }

    #[test]
    fn test_at_least_one_component_over_many_draws() {
        let config = MixedConfig::default();
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..10_000 {
            let draws = [rng.f64(), rng.f64(), rng.f64(), rng.f64(), rng.f64()];
            assert!(!select_components(&config, draws).is_empty());
        }
    }
}
