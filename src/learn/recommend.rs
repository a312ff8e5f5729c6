//! Topic and material recommendations.
//!
//! Three tiers fill a fixed number of slots in order: topics the learner is
//! struggling with, topics never started, then any remaining material.
//! A topic appears at most once.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{
    LearningStyle, MaterialType, ProgressRecord, StudyMaterial, Topic, PASSING_SCORE,
};

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    Struggling,
    Unstarted,
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub topic_id: Uuid,
    pub topic_name: String,
    pub material: StudyMaterial,
    pub reason: String,
    pub tier: RecommendationTier,
}

/// Snapshot the engine ranks over. Topics and materials are in creation order.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    pub learning_style: LearningStyle,
    pub progress: &'a [ProgressRecord],
    pub topics: &'a [Topic],
    pub materials: &'a [StudyMaterial],
}

#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    limit: usize,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RECOMMENDATION_LIMIT)
    }
}

impl RecommendationEngine {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn recommend(&self, input: &RecommendationInput<'_>) -> Vec<Recommendation> {
        let topics: HashMap<Uuid, &Topic> = input.topics.iter().map(|t| (t.id, t)).collect();
        let mut by_topic: HashMap<Uuid, Vec<&StudyMaterial>> = HashMap::new();
        for material in input.materials {
            by_topic.entry(material.topic_id).or_default().push(material);
        }

        let mut picks = Picks::new(self.limit);
        let style = input.learning_style;

        for record in input.progress.iter().filter(|p| p.score < PASSING_SCORE) {
            if picks.is_full() {
                break;
            }
            let Some(topic) = topics.get(&record.topic_id) else {
                continue;
            };
            let Some(material) = by_topic
                .get(&topic.id)
                .and_then(|materials| pick_for_struggling(materials, style))
            else {
                continue;
            };
            picks.push(
                topic,
                material,
                format!(
                    "Improve score in {} (score: {}) — tailored for {} learners",
                    topic.name, record.score, style
                ),
                RecommendationTier::Struggling,
            );
        }

        let started: HashSet<Uuid> = input.progress.iter().map(|p| p.topic_id).collect();
        for topic in input.topics.iter().filter(|t| !started.contains(&t.id)) {
            if picks.is_full() {
                break;
            }
            let Some(material) = by_topic.get(&topic.id).and_then(|m| pick_for_new(m)) else {
                continue;
            };
            picks.push(
                topic,
                material,
                format!("Explore new topic: {}", topic.name),
                RecommendationTier::Unstarted,
            );
        }

        for material in input.materials {
            if picks.is_full() {
                break;
            }
            let Some(topic) = topics.get(&material.topic_id) else {
                continue;
            };
            picks.push(
                topic,
                material,
                format!("General recommendation: {}", topic.name),
                RecommendationTier::General,
            );
        }

        picks.into_inner()
    }
}

/// Quiz first, then the style's preferred type, then whatever comes first.
fn pick_for_struggling<'a>(
    materials: &[&'a StudyMaterial],
    style: LearningStyle,
) -> Option<&'a StudyMaterial> {
    find_type(materials, MaterialType::Quiz)
        .or_else(|| find_type(materials, style.preferred_material()))
        .or_else(|| materials.first().copied())
}

fn pick_for_new<'a>(materials: &[&'a StudyMaterial]) -> Option<&'a StudyMaterial> {
    find_type(materials, MaterialType::Quiz).or_else(|| materials.first().copied())
}

fn find_type<'a>(materials: &[&'a StudyMaterial], kind: MaterialType) -> Option<&'a StudyMaterial> {
    materials.iter().copied().find(|m| m.material_type == kind)
}

struct Picks {
    limit: usize,
    seen: HashSet<Uuid>,
    items: Vec<Recommendation>,
}

impl Picks {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: HashSet::new(),
            items: Vec::with_capacity(limit),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    fn push(
        &mut self,
        topic: &Topic,
        material: &StudyMaterial,
        reason: String,
        tier: RecommendationTier,
    ) {
        if self.is_full() || !self.seen.insert(topic.id) {
            return;
        }
        self.items.push(Recommendation {
            topic_id: topic.id,
            topic_name: topic.name.clone(),
            material: material.clone(),
            reason,
            tier,
        });
    }

    fn into_inner(self) -> Vec<Recommendation> {
        self.items
    }
}
