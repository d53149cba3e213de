//! Swimmer demo
//!
//! The thinnest possible simulation loop around the collision engine: sphere
//! agents random-walk inside an icosphere boundary, recursive reflection
//! keeps them contained, and wall penetration accumulates repulsion forces.
//! The K-d tree prunes each step's segment query before the exact pass runs.

mod config;

use collision_engine::prelude::*;
use config::SwimmerConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// How often a progress summary is logged
const REPORT_INTERVAL: usize = 100;

fn main() {
    collision_engine::foundation::logging::init();

    let config = SwimmerConfig::load_or_default(Path::new("swimmer.toml"));
    log::info!("swimmer demo: {config:?}");

    let boundary = icosphere(config.boundary_radius, Vec3::zeros(), config.subdivisions);
    let tree = match KdTree::from_mesh(&boundary) {
        Ok(tree) => tree,
        Err(err) => {
            log::error!("failed to index the boundary mesh: {err}");
            return;
        }
    };
    log::info!(
        "boundary: {} vertices, {} faces",
        boundary.vertices().len(),
        boundary.faces().len()
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut agents: Vec<SphereAgent> = (0..config.agents)
        .map(|_| {
            let spawn_radius = config.boundary_radius * 0.5;
            let position = random_direction(&mut rng) * rng.gen_range(0.0..spawn_radius);
            SphereAgent::new(position, config.agent_radius)
        })
        .collect();

    for step in 0..config.steps {
        let mut wall_contacts = 0usize;
        for agent in &mut agents {
            let p1 = agent.position;
            let mut p2 = p1 + random_direction(&mut rng) * config.step_length;

            // Cheap candidate check before the exact reflection pass
            match tree.query_candidates(&boundary, p1, p2) {
                Ok(candidates) => {
                    if !candidates.is_empty() {
                        reflect(p1, &mut p2, &boundary, true, ReflectStrategy::NearestHit);
                    }
                }
                Err(err) => {
                    log::error!("boundary query failed: {err}");
                    return;
                }
            }
            agent.position = p2;

            agent.force = Vec3::zeros();
            repel(agent, &boundary);
            if agent.force != Vec3::zeros() {
                wall_contacts += 1;
            }
        }

        if step % REPORT_INTERVAL == 0 {
            let mean_radius: f64 =
                agents.iter().map(|a| a.position.norm()).sum::<f64>() / agents.len() as f64;
            log::info!(
                "step {step}: mean radial distance {mean_radius:.3}, {wall_contacts} wall contacts"
            );
        }
    }

    let escaped = agents
        .iter()
        .filter(|a| a.position.norm() > config.boundary_radius)
        .count();
    log::info!(
        "done after {} steps: {escaped}/{} agents outside the boundary",
        config.steps,
        agents.len()
    );
}

/// Uniformly distributed unit vector
fn random_direction(rng: &mut StdRng) -> Vec3 {
    // Rejection sampling inside the unit ball avoids pole clustering
    loop {
        let candidate = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let length = candidate.norm();
        if length > 1e-6 && length <= 1.0 {
            return candidate / length;
        }
    }
}
