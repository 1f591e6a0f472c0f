//! Advect a grid of markers through a rigid rotation on a structured
//! quad mesh. Usage: `advect_demo [config.toml]`.

use fem_markers::mesh::generator;
use fem_markers::{
    ButcherTableau, DriverConfig, MarkerSet, MarkerStatus, NodalField, SerialComm, Solution,
};
use log::info;
use nalgebra::{Point2, Vector2};
use std::env;
use std::process;

fn main() {
    env_logger::init();

    let cfg = match env::args().nth(1) {
        Some(path) => match DriverConfig::from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        None => DriverConfig::default(),
    };

    if let Err(e) = run(&cfg) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cfg: &DriverConfig) -> Result<(), fem_markers::MarkerError> {
    let mesh = generator::quad_grid(cfg.domain.nx, cfg.domain.ny, cfg.domain.lx, cfg.domain.ly);
    info!(
        "mesh: {} nodes, {} elements",
        mesh.num_nodes(),
        mesh.num_elements()
    );

    // Rigid rotation about the domain center.
    let center = Vector2::new(cfg.domain.lx / 2.0, cfg.domain.ly / 2.0);
    let velocity: Vec<Vector2<f64>> = mesh
        .geometry
        .nodes
        .iter()
        .map(|p| {
            let r = p.coords - center;
            Vector2::new(-r.y, r.x)
        })
        .collect();
    let sol = Solution::new(&mesh, NodalField::steady(velocity))?;

    // Seed markers on an inset grid.
    let mut seeds = Vec::new();
    for j in 0..cfg.seeds.ny {
        for i in 0..cfg.seeds.nx {
            let fx = (i as f64 + 0.5) / cfg.seeds.nx as f64;
            let fy = (j as f64 + 0.5) / cfg.seeds.ny as f64;
            let m = cfg.seeds.margin;
            seeds.push(Point2::new(
                cfg.domain.lx * (m + (1.0 - 2.0 * m) * fx),
                cfg.domain.ly * (m + (1.0 - 2.0 * m) * fy),
            ));
        }
    }

    let comm = SerialComm;
    let tableau = ButcherTableau::new(cfg.advection.order)?;
    let mut set = MarkerSet::from_points(&seeds, &mesh, &sol, &cfg.tracking)?;
    info!("seeded {} markers", set.len());

    for step in 0..cfg.advection.steps {
        set.advect_all(
            &mesh,
            &sol,
            &comm,
            &tableau,
            cfg.advection.substeps,
            cfg.advection.dt,
            &cfg.tracking,
        )?;
        info!(
            "macro step {}: {} of {} markers active",
            step + 1,
            set.num_active(),
            set.len()
        );
        for (i, m) in set.markers.iter().enumerate() {
            if m.status == MarkerStatus::Active {
                info!(
                    "  marker {i}: x = ({:.4}, {:.4}), element {:?}",
                    m.position.x, m.position.y, m.element
                );
            }
        }
    }
    Ok(())
}
