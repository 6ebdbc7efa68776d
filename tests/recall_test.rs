//! Recall tests: the forest finds a high share of true nearest neighbors,
//! and recall never degrades as the candidate budget grows.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use annforest::{AnnIndex, DistanceMetric, Neighbor};

fn random_vectors(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect())
        .collect()
}

fn brute_force(
    vectors: &[Vec<f32>],
    metric: DistanceMetric,
    query: &[f32],
    k: usize,
) -> Vec<Neighbor> {
    let mut all: Vec<Neighbor> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| Neighbor::new(i as u32, metric.distance(query, v)))
        .collect();
    all.sort();
    all.truncate(k);
    all
}

fn recall_at_k(exact: &[Neighbor], approx: &[Neighbor]) -> f64 {
    let ground_truth: HashSet<u32> = exact.iter().map(|n| n.id).collect();
    let found = approx
        .iter()
        .filter(|n| ground_truth.contains(&n.id))
        .count();
    found as f64 / exact.len() as f64
}

fn build_index(vectors: &[Vec<f32>], metric: DistanceMetric, trees: usize) -> AnnIndex {
    let mut index = AnnIndex::new(vectors[0].len(), metric);
    index.set_seed(4242).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        index.add_item(i as u32, v).unwrap();
    }
    index.build(trees).unwrap();
    index
}

fn average_recall(
    index: &AnnIndex,
    vectors: &[Vec<f32>],
    queries: &[Vec<f32>],
    k: usize,
    search_k: Option<usize>,
) -> f64 {
    let mut total = 0.0;
    for query in queries {
        let exact = brute_force(vectors, index.metric(), query, k);
        let approx = index.nearest_by_vector(query, k, search_k).unwrap();
        total += recall_at_k(&exact, &approx);
    }
    total / queries.len() as f64
}

#[test]
fn test_recall_1000_vectors_euclidean() {
    let mut rng = StdRng::seed_from_u64(1);
    let vectors = random_vectors(&mut rng, 1000, 16);
    let queries = random_vectors(&mut rng, 30, 16);
    let index = build_index(&vectors, DistanceMetric::Euclidean, 20);

    let recall = average_recall(&index, &vectors, &queries, 10, Some(2000));
    assert!(recall >= 0.90, "recall {recall:.3} below threshold");
}

#[test]
fn test_recall_angular() {
    let mut rng = StdRng::seed_from_u64(2);
    let vectors = random_vectors(&mut rng, 500, 24);
    let queries = random_vectors(&mut rng, 20, 24);
    let index = build_index(&vectors, DistanceMetric::Angular, 20);

    let recall = average_recall(&index, &vectors, &queries, 10, Some(1000));
    assert!(recall >= 0.85, "recall {recall:.3} below threshold");
}

#[test]
fn test_recall_is_monotone_in_search_k() {
    let mut rng = StdRng::seed_from_u64(3);
    let vectors = random_vectors(&mut rng, 800, 12);
    let queries = random_vectors(&mut rng, 25, 12);
    let index = build_index(&vectors, DistanceMetric::Euclidean, 10);

    let budgets = [20, 50, 100, 200, 400, 800];
    let mut previous = 0.0;
    for budget in budgets {
        let recall = average_recall(&index, &vectors, &queries, 10, Some(budget));
        assert!(
            recall >= previous,
            "recall dropped from {previous:.3} to {recall:.3} at search_k={budget}"
        );
        previous = recall;
    }
}

#[test]
fn test_full_budget_equals_brute_force() {
    let mut rng = StdRng::seed_from_u64(4);
    let vectors = random_vectors(&mut rng, 300, 8);
    let queries = random_vectors(&mut rng, 10, 8);
    let index = build_index(&vectors, DistanceMetric::Euclidean, 5);

    for query in &queries {
        let exact = brute_force(&vectors, DistanceMetric::Euclidean, query, 10);
        let approx = index.nearest_by_vector(query, 10, Some(300)).unwrap();
        assert_eq!(exact, approx);
    }
}

#[test]
fn test_more_trees_do_not_hurt_recall_much() {
    // A sanity check on the size/recall trade-off: a bigger forest with the
    // default budget should be at least as accurate as a single tree.
    let mut rng = StdRng::seed_from_u64(5);
    let vectors = random_vectors(&mut rng, 600, 16);
    let queries = random_vectors(&mut rng, 20, 16);

    let small = build_index(&vectors, DistanceMetric::Euclidean, 1);
    let large = build_index(&vectors, DistanceMetric::Euclidean, 25);

    let recall_small = average_recall(&small, &vectors, &queries, 10, None);
    let recall_large = average_recall(&large, &vectors, &queries, 10, None);
    assert!(recall_large + 1e-9 >= recall_small);
}
