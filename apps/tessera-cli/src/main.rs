use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::DVec2;
use tessera_author::Editor;
use tessera_bake::{Baker, HeadlessPhysics, HeadlessRenderer};
use tessera_common::{
    BlockCoord, CHUNK_HEIGHT, CHUNK_WIDTH, SECTOR_HEIGHT, SECTOR_WIDTH, WorldBlockCoord,
    WorldSectorCoord,
};
use tessera_kernel::{
    Block, BlockEntity, BlockStorage, BlockTypeDictionary, EventBus, Terrain, TerrainEvent,
};
use tessera_persist::SectorStore;
use tessera_stream::{StreamConfig, StreamingManager};
use tessera_tools::TerrainInspector;
use tessera_worldgen::{GeneratorConfig, Seed, TerrainGenerator};
use tracing_subscriber::EnvFilter;

const DT: f64 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "tessera-cli", about = "CLI tool for tessera worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, world dimensions and the default block catalog
    Info,
    /// Generate one sector and print its report and map
    Generate {
        #[arg(short, long, default_value_t = Seed::DEFAULT)]
        seed: u64,
        #[arg(short, default_value = "0", allow_negative_numbers = true)]
        x: i64,
        #[arg(short, default_value = "0", allow_negative_numbers = true)]
        y: i64,
        /// Save the sector into this store directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Inspect saved sectors in a store directory
    Inspect {
        dir: PathBuf,
        /// Sector x; with -y, inspect a single sector
        #[arg(short, allow_negative_numbers = true, requires = "y")]
        x: Option<i64>,
        #[arg(short, allow_negative_numbers = true, requires = "x")]
        y: Option<i64>,
        /// Print chunk fill maps
        #[arg(long)]
        map: bool,
        #[arg(long)]
        json: bool,
    },
    /// Stream terrain around a pushed block entity with headless backends
    Simulate {
        #[arg(short, long, default_value_t = Seed::DEFAULT)]
        seed: u64,
        /// Number of physics steps at 60 Hz
        #[arg(long, default_value = "1200")]
        steps: u64,
        /// Horizontal force applied to the entity every step
        #[arg(long, default_value = "2.0")]
        force: f64,
        /// Save sectors here; overrides the config's save_dir
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Stream config JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Block catalog JSON
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Info => info()?,
        Commands::Generate {
            seed,
            x,
            y,
            out,
            json,
        } => generate(seed, WorldSectorCoord::new(x, y), out.as_deref(), json)?,
        Commands::Inspect {
            dir,
            x,
            y,
            map,
            json,
        } => {
            let only = x.zip(y).map(|(x, y)| WorldSectorCoord::new(x, y));
            inspect(&dir, only, map, json)?
        }
        Commands::Simulate {
            seed,
            steps,
            force,
            data_dir,
            config,
            catalog,
        } => {
            let mut stream = match config {
                Some(path) => StreamConfig::load(&path)
                    .with_context(|| format!("loading stream config {}", path.display()))?,
                None => StreamConfig::default(),
            };
            if data_dir.is_some() {
                stream.save_dir = data_dir;
            }
            let dictionary = load_catalog(catalog.as_deref())?;
            simulate(Seed::new(seed), steps, force, stream, dictionary)?
        }
    }

    Ok(())
}

fn info() -> anyhow::Result<()> {
    println!("tessera-cli v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "chunk: {CHUNK_WIDTH}x{CHUNK_HEIGHT} blocks, sector: {SECTOR_WIDTH}x{SECTOR_HEIGHT} chunks"
    );
    println!("default catalog:");
    let dictionary = BlockTypeDictionary::default_catalog();
    for (layer, desc) in dictionary.iter().enumerate() {
        println!(
            "  {} layer={layer} density={} friction={} restitution={}",
            desc.tag,
            desc.density,
            desc.friction,
            desc.restitution
        );
    }
    println!(
        "default generator: {}",
        serde_json::to_string(&GeneratorConfig::default())?
    );
    println!(
        "default streaming: {}",
        serde_json::to_string(&StreamConfig::default())?
    );
    Ok(())
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<BlockTypeDictionary> {
    let Some(path) = path else {
        return Ok(BlockTypeDictionary::default_catalog());
    };
    let file =
        std::fs::File::open(path).with_context(|| format!("opening catalog {}", path.display()))?;
    Ok(BlockTypeDictionary::from_json_reader(file)?)
}

fn generate(
    seed: u64,
    coord: WorldSectorCoord,
    out: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let generator = TerrainGenerator::with_seed(Seed::new(seed));
    let sector = generator.generate_sector(coord);
    let report = TerrainInspector::sector_report(&sector);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("seed={seed} {report}");
        print!("{}", TerrainInspector::sector_map(&sector));
    }

    if let Some(dir) = out {
        let store = SectorStore::open(dir)?;
        let path = store.save(&sector)?;
        println!("saved {}", path.display());
    }
    Ok(())
}

fn inspect(
    dir: &Path,
    only: Option<WorldSectorCoord>,
    map: bool,
    json: bool,
) -> anyhow::Result<()> {
    let store = SectorStore::open(dir)?;
    let coords = match only {
        Some(coord) => vec![coord],
        None => store.list()?,
    };
    if coords.is_empty() {
        println!("no sectors in {}", dir.display());
        return Ok(());
    }

    let mut reports = Vec::new();
    for coord in coords {
        let sector = match store.load(coord) {
            Ok(Some(sector)) => sector,
            Ok(None) => {
                println!("sector {coord}: not saved");
                continue;
            }
            Err(e) => {
                println!("sector {coord}: unreadable ({e})");
                continue;
            }
        };
        let report = TerrainInspector::sector_report(&sector);
        if !json {
            println!("{report}");
            if map {
                print!("{}", TerrainInspector::sector_map(&sector));
            }
        }
        reports.push(report);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}

fn simulate(
    seed: Seed,
    steps: u64,
    force: f64,
    config: StreamConfig,
    dictionary: BlockTypeDictionary,
) -> anyhow::Result<()> {
    let _span = tracing::info_span!("simulate", seed = seed.number(), steps).entered();
    let dictionary = Arc::new(dictionary);
    let terrain = Arc::new(Terrain::new());
    let bus = EventBus::new();

    let (manager, consumer) = StreamingManager::start(
        config,
        Arc::clone(&terrain),
        Arc::new(TerrainGenerator::with_seed(seed)),
        Arc::clone(&dictionary),
        bus.publisher(),
    )?;
    let mut frame = manager.frame_baker(
        Baker::new(HeadlessRenderer::new(), HeadlessPhysics::new()),
        consumer,
        bus.publisher(),
    );
    let mut editor = Editor::with_events(bus.publisher());

    let mut entity = BlockEntity::new(DVec2::new(8.0, 8.0));
    entity.set_block(BlockCoord::new(0, 0), Block::new("stone"));
    frame.baker_mut().bake_entity(&entity, &dictionary);
    manager.on_entity_moved(entity.position)?;

    let (mut loaded, mut evicted, mut edits) = (0usize, 0usize, 0usize);
    for step in 0..steps {
        frame.baker_mut().push_entity(entity.id, DVec2::new(force, 0.0));
        frame.baker_mut().step(DT);
        frame.baker().sync_entity(&mut entity);
        manager.on_entity_moved(entity.position)?;
        frame.tick();

        if step == steps / 2 {
            let below = WorldBlockCoord::containing(entity.position).offset(0, -1);
            match editor.place(&terrain, below, Block::new("stone")) {
                Ok(chunk) => manager.request_rebake(chunk)?,
                Err(e) => tracing::warn!(error = %e, "edit skipped"),
            }
        }
        for event in bus.drain() {
            match event {
                TerrainEvent::SectorLoaded { .. } => loaded += 1,
                TerrainEvent::SectorEvicted { .. } => evicted += 1,
                TerrainEvent::BlockChanged { .. } => edits += 1,
                _ => {}
            }
        }
        if step % 300 == 0 {
            tracing::info!(
                step,
                x = entity.position.x,
                y = entity.position.y,
                resident = terrain.len(),
                baked = frame.baker().baked_chunk_count(),
                "simulation progress"
            );
        }
    }

    let settled = frame.drain_all();
    frame.baker_mut().renderer_mut().begin_frame();
    let draws = frame.draw();

    println!(
        "entity at ({:.1}, {:.1}) in sector {}",
        entity.position.x,
        entity.position.y,
        WorldBlockCoord::containing(entity.position).sector()
    );
    println!("{}", TerrainInspector::summary(&terrain));
    println!(
        "events: loaded={loaded} evicted={evicted} edits={edits}; settle bakes={} destroys={}",
        settled.bakes, settled.destroys
    );
    println!(
        "frame: draws={draws} visible_quads={} avg_tick={:?} max_tick={:?} bake_rate={:.0}/s",
        frame.baker().renderer().visible_quads_this_frame(),
        frame.history().average(),
        frame.history().max(),
        frame.history().bake_rate()
    );

    let stats = manager.shutdown()?;
    println!(
        "stream: generated={} loaded={} evicted={} save_failures={}",
        stats.generated, stats.loaded, stats.evicted, stats.save_failures
    );
    Ok(())
}
