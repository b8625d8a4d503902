use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use slotwise_core::LocationCode;
use slotwise_inventory::{
    AllocationConfig, AssignmentMode, ContainerLedger, DemandLine, Location, OutboundLine,
    SlotAllocator, ZoneType, reconcile,
};

const DESTINATIONS: &[&str] = &[
    "XLX7", "ONT8", "LGB8", "SBD1", "POC2", "UPS", "FedEx", "Walmart DC", "商业地址", "Wayfair",
    "中转", "$ electronics",
];

const ZONES: &[(&str, ZoneType)] = &[
    ("A", ZoneType::AmazonMainA),
    ("B", ZoneType::AmazonMainB),
    ("C", ZoneType::AmazonBuffer),
    ("V", ZoneType::Private),
    ("G", ZoneType::Platform),
    ("E", ZoneType::Express),
    ("W", ZoneType::Walmart),
    ("H", ZoneType::HighValue),
    ("S", ZoneType::Suspense),
];

/// Synthetic warehouse: `per_zone` bins in every zone, a third of them part-filled.
fn warehouse(per_zone: usize) -> Vec<Location> {
    let mut out = Vec::with_capacity(per_zone * ZONES.len());
    for (prefix, zone) in ZONES {
        for n in 1..=per_zone {
            let code = LocationCode::new(format!("{prefix}{n:02}")).expect("valid code");
            let loc = Location::new(code, *zone)
                .with_max_pallets(30)
                .with_max_destination_tags(4);
            if n % 3 == 0 {
                out.push(loc.with_stock(DESTINATIONS[n % DESTINATIONS.len()], 12, 120));
            } else {
                out.push(loc);
            }
        }
    }
    out
}

fn batch(size: usize) -> Vec<DemandLine> {
    (0..size)
        .map(|i| {
            DemandLine::new(i, DESTINATIONS[i % DESTINATIONS.len()], (i % 6 + 1) as i64)
                .with_cartons(((i % 6 + 1) * 10) as i64)
        })
        .collect()
}

fn bench_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign");
    let allocator = SlotAllocator::new(AllocationConfig::default().with_split(true));

    for &(per_zone, lines) in &[(10usize, 50usize), (40, 200), (100, 1_000)] {
        let locations = warehouse(per_zone);
        let demand = batch(lines);
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(
            BenchmarkId::new("lines", format!("{lines}x{}", locations.len())),
            &(locations, demand),
            |b, (locations, demand)| {
                b.iter(|| allocator.assign(black_box(demand), black_box(locations), AssignmentMode::Automatic))
            },
        );
    }
    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let locations = warehouse(100);
    let outbound: Vec<OutboundLine> = locations
        .iter()
        .filter_map(|loc| {
            loc.destination_tags
                .first()
                .map(|tag| OutboundLine::new(loc.code.as_str(), tag.as_str(), 5))
        })
        .collect();
    let ledger = ContainerLedger::new();

    c.bench_function("reconcile/full_warehouse", |b| {
        b.iter(|| reconcile(black_box(&outbound), black_box(&locations), black_box(&ledger)))
    });
}

criterion_group!(benches, bench_assignment, bench_reconcile);
criterion_main!(benches);
