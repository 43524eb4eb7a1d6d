use glam::Vec2;
use std::time::Instant;
use sweepbox::*;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn unit(seed: &mut u32) -> f32 {
    lcg(seed) as f32 / u32::MAX as f32
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    for &cell_size in &[8.0f32, 32.0, 128.0] {
        let mut world: World<usize> = World::new(WorldConfig {
            cell_size,
            ..WorldConfig::default()
        });

        let n = 20_000usize; // number of static boxes
        let movers = 2_000usize;
        let mut seed = 1u32;

        let t0 = Instant::now();
        for i in 0..n {
            let x = unit(&mut seed) * 2000.0 - 1000.0;
            let y = unit(&mut seed) * 2000.0 - 1000.0;
            let w = 2.0 + unit(&mut seed) * 14.0;
            let h = 2.0 + unit(&mut seed) * 14.0;
            world.create(x, y, w, h, i).unwrap();
        }
        let t_build = t0.elapsed();

        let mut ids = Vec::with_capacity(movers);
        for i in 0..movers {
            let x = unit(&mut seed) * 2000.0 - 1000.0;
            let y = unit(&mut seed) * 2000.0 - 1000.0;
            ids.push(world.create(x, y, 4.0, 4.0, n + i).unwrap());
        }

        let t1 = Instant::now();
        let mut hits = 0usize;
        for &id in &ids {
            let pos = world.bounds(id).unwrap().pos;
            let d = Vec2::new(unit(&mut seed) - 0.5, unit(&mut seed) - 0.5) * 64.0;
            let m = world.move_to(id, pos + d, |_| Some(Response::Slide)).unwrap();
            hits += m.hits.len();
        }
        let t_move = t1.elapsed();

        let t2 = Instant::now();
        let mut found = 0usize;
        for _ in 0..movers {
            let a = Vec2::new(unit(&mut seed), unit(&mut seed)) * 2000.0 - Vec2::splat(1000.0);
            found += world.query(&Rect::new(a.x, a.y, 50.0, 50.0)).len();
            found += world.query_segment(a, a + Vec2::new(200.0, 80.0)).len();
        }
        let t_query = t2.elapsed();

        let stats = world.debug_stats();
        println!(
            "N={} cell_size={} build={:.3}ms move={:.3}ms ({} hits) query={:.3}ms ({} found) cells={} max_occ={}",
            stats.boxes,
            cell_size,
            t_build.as_secs_f64() * 1e3,
            t_move.as_secs_f64() * 1e3,
            hits,
            t_query.as_secs_f64() * 1e3,
            found,
            stats.cells,
            stats.max_cell_occupancy
        );
    }
}
