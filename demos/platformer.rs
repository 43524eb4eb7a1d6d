use glam::Vec2;
use sweepbox::*;

const SOLID: u32 = 0;
const COIN: u32 = 1;
const ONE_WAY: u32 = 2;

#[derive(Debug)]
enum Thing {
    Player,
    Tile,
    Coin(u32),
    Ledge,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut world: World<Thing> = World::new(WorldConfig {
        cell_size: 32.0,
        ..WorldConfig::default()
    });

    // 16px tiles: a floor row plus a wall on each side.
    for i in 0..20 {
        let floor = world
            .create(i as f32 * 16.0, 160.0, 16.0, 16.0, Thing::Tile)
            .unwrap();
        world.add_tags(floor, [SOLID]).unwrap();
    }
    for j in 0..10 {
        for x in [0.0, 304.0] {
            let wall = world.create(x, j as f32 * 16.0, 16.0, 16.0, Thing::Tile).unwrap();
            world.add_tags(wall, [SOLID]).unwrap();
        }
    }
    for (k, x) in [64.0, 112.0, 208.0].into_iter().enumerate() {
        let coin = world.create(x, 140.0, 8.0, 8.0, Thing::Coin(k as u32)).unwrap();
        world.add_tags(coin, [COIN]).unwrap();
    }
    let ledge = world.create(160.0, 110.0, 48.0, 4.0, Thing::Ledge).unwrap();
    world.add_tags(ledge, [ONE_WAY]).unwrap();

    let player = world.create(32.0, 40.0, 12.0, 20.0, Thing::Player).unwrap();

    let rules = TagRules::new(None)
        .rule([SOLID], Some(Response::Slide))
        .rule([COIN], Some(Response::Ignore));

    let gravity = 900.0;
    let dt = 1.0 / 60.0;
    let mut vel = Vec2::new(120.0, 0.0);
    let mut score = 0;

    for frame in 0..180 {
        vel.y += gravity * dt;
        let pos = world.bounds(player).unwrap().pos;
        let m = world
            .move_to(player, pos + vel * dt, |c| {
                if c.other.tags.contains(ONE_WAY) {
                    // Ledges only hold what lands on them from above.
                    return (c.normal == Vec2::new(0.0, -1.0)).then_some(Response::Slide);
                }
                rules.select(c)
            })
            .unwrap();

        for hit in &m.hits {
            if let Ok(Thing::Coin(k)) = world.payload(hit.other) {
                println!("frame {frame}: picked up coin {k}");
                score += 1;
            }
        }
        let coins: Vec<BoxId> = m
            .hits
            .iter()
            .filter(|h| h.response == Response::Ignore)
            .map(|h| h.other)
            .collect();
        for coin in coins {
            world.remove(coin).unwrap();
        }

        let grounded = m.blocked_by(Vec2::new(0.0, -1.0));
        if grounded {
            vel.y = 0.0;
        }
        if m.blocked_by(Vec2::new(-1.0, 0.0)) || m.blocked_by(Vec2::new(1.0, 0.0)) {
            vel.x = -vel.x;
        }
        if frame % 20 == 0 {
            println!(
                "frame {frame}: pos=({:.1},{:.1}) grounded={grounded} hits={}",
                m.destination.pos.x,
                m.destination.pos.y,
                m.hits.len()
            );
        }
    }

    println!("score={score} stats={:?}", world.debug_stats());
}
