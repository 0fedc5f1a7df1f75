use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

/// Approved members who have not yet won this equb, in their original order.
pub fn eligible_members(approved: &[Uuid], past_winners: &[Uuid]) -> Vec<Uuid> {
    let won: HashSet<&Uuid> = past_winners.iter().collect();
    approved
        .iter()
        .filter(|id| !won.contains(id))
        .copied()
        .collect()
}

/// Uniform pick over the eligible set. `None` when nobody is left.
pub fn draw_winner<R: Rng + ?Sized>(eligible: &[Uuid], rng: &mut R) -> Option<Uuid> {
    eligible.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_past_winner_excluded_from_eligible_set() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let eligible = eligible_members(&[a, b, c], &[b]);
        assert_eq!(eligible, vec![a, c]);
    }

    #[test]
    fn test_winner_of_another_equb_does_not_matter() {
        let a = Uuid::new_v4();
        let outsider = Uuid::new_v4();
        assert_eq!(eligible_members(&[a], &[outsider]), vec![a]);
    }

    #[test]
    fn test_everyone_won_leaves_empty_set() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let eligible = eligible_members(&[a, b], &[b, a]);
        assert!(eligible.is_empty());

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(draw_winner(&eligible, &mut rng), None);
    }

    #[test]
    fn test_draw_picks_only_eligible_members() {
        let members: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let picked = draw_winner(&members, &mut rng).unwrap();
            assert!(members.contains(&picked));
        }
    }

    #[test]
    fn test_draw_is_roughly_uniform() {
        let members: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts: HashMap<Uuid, usize> = HashMap::new();

        for _ in 0..4000 {
            *counts.entry(draw_winner(&members, &mut rng).unwrap()).or_default() += 1;
        }

        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            // Expected 1000 each
            assert!(*count > 850 && *count < 1150, "skewed count {}", count);
        }
    }
}
