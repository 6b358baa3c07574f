use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use tessera_bake::{Baker, ChunkArtifacts, HeadlessPhysics, HeadlessRenderer};
use tessera_common::WorldSectorCoord;
use tessera_kernel::{BlockTypeDictionary, EventPublisher, Terrain};
use tessera_stream::{
    CancelToken, FrameBaker, SectorTracker, StreamConfig, Streamer, plan, target_set,
};
use tessera_worldgen::{Seed, TerrainGenerator};

fn bench_plan(radius: u32, iterations: usize) {
    let resident = target_set(WorldSectorCoord::ORIGIN, radius);
    let start = Instant::now();
    for i in 0..iterations {
        let center = WorldSectorCoord::new((i % 3) as i64, 0);
        let _ = black_box(plan(black_box(center), radius, resident.iter().copied()));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  plan (r={radius}, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_generate_sector(iterations: usize) {
    let generator = TerrainGenerator::with_seed(Seed::default());
    let start = Instant::now();
    for i in 0..iterations {
        let coord = WorldSectorCoord::new(i as i64, -(i as i64));
        let _ = black_box(generator.generate_sector(black_box(coord)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  generate sector ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_artifacts(iterations: usize) {
    let generator = TerrainGenerator::with_seed(Seed::default());
    let dictionary = BlockTypeDictionary::default_catalog();
    let sector = generator.generate_sector(WorldSectorCoord::ORIGIN);
    let start = Instant::now();
    for _ in 0..iterations {
        for chunk in sector.chunks() {
            let coord = sector.world_chunk(chunk.coord);
            let _ = black_box(ChunkArtifacts::compute(coord, chunk, &dictionary));
        }
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  sector artifacts ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_cold_start(view_radius: u32, iterations: usize) {
    let mut refresh = std::time::Duration::ZERO;
    let mut drain = std::time::Duration::ZERO;
    for _ in 0..iterations {
        let config = StreamConfig {
            view_radius,
            queue_capacity: 1 << 16,
            ..StreamConfig::default()
        };
        let (producer, consumer) =
            tessera_stream::work_queues(config.queue_capacity, config.poll_interval());
        let terrain = Arc::new(Terrain::new());
        let tracker = Arc::new(SectorTracker::new());
        let mut frame = FrameBaker::new(
            Baker::new(HeadlessRenderer::new(), HeadlessPhysics::new()),
            consumer,
            Arc::clone(&terrain),
            Arc::clone(&tracker),
            EventPublisher::detached(),
            &config,
        );
        let mut streamer = Streamer::new(
            config,
            terrain,
            None,
            Arc::new(TerrainGenerator::with_seed(Seed::default())),
            Arc::new(BlockTypeDictionary::default_catalog()),
            tracker,
            producer,
            EventPublisher::detached(),
            CancelToken::new(),
        );

        let start = Instant::now();
        streamer.set_target(WorldSectorCoord::ORIGIN);
        let _ = streamer.tick();
        refresh += start.elapsed();

        let start = Instant::now();
        black_box(frame.drain_all());
        drain += start.elapsed();
    }
    println!(
        "  cold start (r={view_radius}, {iterations} iters): refresh {:?}/iter, drain {:?}/iter",
        refresh / iterations as u32,
        drain / iterations as u32
    );
}

fn main() {
    println!("=== Streaming Benchmarks ===\n");

    println!("Plan:");
    bench_plan(1, 100_000);
    bench_plan(4, 10_000);

    println!("\nGeneration:");
    bench_generate_sector(20);

    println!("\nArtifacts:");
    bench_artifacts(20);

    println!("\nCold start (refresh + frame drain):");
    bench_cold_start(1, 5);
    bench_cold_start(2, 2);

    println!("\n=== Done ===");
}
