//! Demo catalog loaded with `--seed` or `learn.seed_demo_catalog = true`.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::types::{
    normalize_questions, AnswerValue, Course, MaterialType, QuestionInput, QuizData,
    StudyMaterial, Topic,
};
use crate::store::{DocumentStore, StoreError, StoreResult};

struct SeedQuestion {
    question: &'static str,
    options: &'static [&'static str],
    correct: usize,
}

enum SeedMaterial {
    Video(&'static str, &'static str),
    Pdf(&'static str, &'static str),
    Quiz(&'static str, &'static [SeedQuestion]),
}

struct SeedTopic {
    name: &'static str,
    description: &'static str,
    materials: &'static [SeedMaterial],
}

struct SeedCourse {
    name: &'static str,
    description: &'static str,
    topics: &'static [SeedTopic],
}

const CATALOG: &[SeedCourse] = &[
    SeedCourse {
        name: "Mathematics",
        description: "Comprehensive mathematics curriculum covering algebra, geometry, calculus, and statistics",
        topics: &[
            SeedTopic {
                name: "Algebra Basics",
                description: "Variables, equations, and basic algebraic operations",
                materials: &[
                    SeedMaterial::Video(
                        "Algebra Basics Introduction",
                        "https://www.youtube.com/watch?v=NybHckSEQBI",
                    ),
                    SeedMaterial::Pdf(
                        "Algebra Basics Workbook",
                        "https://www.khanacademy.org/math/algebra",
                    ),
                    SeedMaterial::Quiz(
                        "Algebra Basics Quiz",
                        &[
                            SeedQuestion {
                                question: "Solve for x: 2x + 5 = 15",
                                options: &["x = 5", "x = 10", "x = 7.5", "x = 20"],
                                correct: 0,
                            },
                            SeedQuestion {
                                question: "Simplify: 3(x + 2) - 2x",
                                options: &["x + 6", "x + 2", "5x + 6", "x - 6"],
                                correct: 0,
                            },
                            SeedQuestion {
                                question: "What is the value of x if x/4 = 8?",
                                options: &["2", "32", "12", "4"],
                                correct: 1,
                            },
                        ],
                    ),
                ],
            },
            SeedTopic {
                name: "Geometry Fundamentals",
                description: "Shapes, angles, area, and perimeter calculations",
                materials: &[
                    SeedMaterial::Video(
                        "Geometry Fundamentals Explained",
                        "https://www.youtube.com/watch?v=oSXGNucF-bA",
                    ),
                    SeedMaterial::Pdf(
                        "Geometry Shapes Guide",
                        "https://www.khanacademy.org/math/geometry",
                    ),
                    SeedMaterial::Quiz(
                        "Geometry Quiz",
                        &[
                            SeedQuestion {
                                question: "What is the area of a rectangle with length 8 and width 5?",
                                options: &["13", "40", "26", "80"],
                                correct: 1,
                            },
                            SeedQuestion {
                                question: "How many degrees are in a triangle?",
                                options: &["90", "180", "360", "270"],
                                correct: 1,
                            },
                            SeedQuestion {
                                question: "What is the perimeter of a square with side length 6?",
                                options: &["12", "18", "24", "36"],
                                correct: 2,
                            },
                        ],
                    ),
                ],
            },
            SeedTopic {
                name: "Quadratic Equations",
                description: "Solving quadratic equations and understanding parabolas",
                materials: &[
                    SeedMaterial::Video(
                        "Quadratic Equations Explained",
                        "https://www.youtube.com/watch?v=i7idZfS8t8w",
                    ),
                    SeedMaterial::Quiz(
                        "Quadratic Equations Quiz",
                        &[
                            SeedQuestion {
                                question: "What is the standard form of a quadratic equation?",
                                options: &["y = mx + b", "ax² + bx + c = 0", "x + y = z", "a/b = c"],
                                correct: 1,
                            },
                            SeedQuestion {
                                question: "How many solutions can a quadratic equation have?",
                                options: &["0, 1, or 2", "Always 2", "Always 1", "Infinite"],
                                correct: 0,
                            },
                        ],
                    ),
                ],
            },
        ],
    },
    SeedCourse {
        name: "Science",
        description: "Exploring physics, chemistry, biology, and earth sciences",
        topics: &[
            SeedTopic {
                name: "Newton's Laws of Motion",
                description: "Understanding force, mass, and acceleration",
                materials: &[
                    SeedMaterial::Video(
                        "Newton's Laws Explained",
                        "https://www.youtube.com/watch?v=kKKM8Y-u7ds",
                    ),
                    SeedMaterial::Pdf(
                        "Physics Laws Guide",
                        "https://www.khanacademy.org/science/physics/forces-newtons-laws",
                    ),
                ],
            },
            SeedTopic {
                name: "Cell Biology",
                description: "Structure and function of cells",
                materials: &[SeedMaterial::Quiz(
                    "Cell Biology Quiz",
                    &[SeedQuestion {
                        question: "Which organelle is known as the powerhouse of the cell?",
                        options: &["Nucleus", "Ribosome", "Mitochondria", "Golgi apparatus"],
                        correct: 2,
                    }],
                )],
            },
        ],
    },
    SeedCourse {
        name: "Computer Science",
        description: "Programming, algorithms, data structures, and software development",
        topics: &[
            SeedTopic {
                name: "Programming Fundamentals",
                description: "Variables, loops, and conditionals",
                materials: &[SeedMaterial::Pdf(
                    "Programming Basics Handbook",
                    "https://www.khanacademy.org/computing/computer-programming",
                )],
            },
            SeedTopic {
                name: "Data Structures",
                description: "Arrays, linked lists, stacks, and queues",
                materials: &[SeedMaterial::Quiz(
                    "Data Structures Quiz",
                    &[
                        SeedQuestion {
                            question: "Which structure follows last-in, first-out order?",
                            options: &["Queue", "Stack", "Array", "Tree"],
                            correct: 1,
                        },
                        SeedQuestion {
                            question: "What is the index of the first element of an array in most languages?",
                            options: &["1", "-1", "0", "It varies randomly"],
                            correct: 2,
                        },
                    ],
                )],
            },
        ],
    },
    SeedCourse {
        name: "English Language Arts",
        description: "Reading comprehension, writing skills, grammar, and literature analysis",
        topics: &[SeedTopic {
            name: "Grammar Essentials",
            description: "Parts of speech, sentence structure, and punctuation",
            materials: &[SeedMaterial::Video(
                "Parts of Speech Overview",
                "https://www.khanacademy.org/humanities/grammar",
            )],
        }],
    },
];

/// Counts of what a seeding run inserted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub courses: usize,
    pub topics: usize,
    pub materials: usize,
}

/// Inserts the demo catalog unless the store already has courses.
pub async fn seed_demo_catalog(store: &dyn DocumentStore) -> StoreResult<SeedSummary> {
    let mut summary = SeedSummary::default();
    if !store.list_courses().await?.is_empty() {
        info!("Catalog already present, skipping demo seed");
        return Ok(summary);
    }

    let now = Utc::now();
    for seed_course in CATALOG {
        let course = store
            .insert_course(Course {
                id: Uuid::new_v4(),
                name: seed_course.name.to_string(),
                description: Some(seed_course.description.to_string()),
                created_at: now,
            })
            .await?;
        summary.courses += 1;

        for seed_topic in seed_course.topics {
            let topic = store
                .insert_topic(Topic {
                    id: Uuid::new_v4(),
                    course_id: course.id,
                    name: seed_topic.name.to_string(),
                    description: Some(seed_topic.description.to_string()),
                    created_at: now,
                })
                .await?;
            summary.topics += 1;

            for seed_material in seed_topic.materials {
                store.insert_material(build_material(topic.id, seed_material)?).await?;
                summary.materials += 1;
            }
        }
    }

    info!(
        "Seeded demo catalog: {} courses, {} topics, {} materials",
        summary.courses, summary.topics, summary.materials
    );
    Ok(summary)
}

fn build_material(topic_id: Uuid, seed: &SeedMaterial) -> StoreResult<StudyMaterial> {
    let (material_type, title, content_url, quiz_data) = match seed {
        SeedMaterial::Video(title, url) => (MaterialType::Video, title, Some(url.to_string()), None),
        SeedMaterial::Pdf(title, url) => (MaterialType::Pdf, title, Some(url.to_string()), None),
        SeedMaterial::Quiz(title, questions) => {
            let inputs = questions
                .iter()
                .map(|q| QuestionInput {
                    question: q.question.to_string(),
                    options: q.options.iter().map(|o| o.to_string()).collect(),
                    correct_answer: AnswerValue::Index(q.correct),
                })
                .collect();
            let questions = normalize_questions(inputs)
                .map_err(|e| StoreError::Invalid(format!("seed quiz '{title}': {e}")))?;
            (MaterialType::Quiz, title, None, Some(QuizData { questions }))
        }
    };

    Ok(StudyMaterial {
        id: Uuid::new_v4(),
        topic_id,
        material_type,
        title: title.to_string(),
        content_url,
        quiz_data,
        quiz_id: None,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        let first = seed_demo_catalog(&store).await.unwrap();
        assert_eq!(first.courses, 4);
        assert!(first.topics >= first.courses);

        let second = seed_demo_catalog(&store).await.unwrap();
        assert_eq!(second, SeedSummary::default());
        assert_eq!(store.list_courses().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_seeded_quizzes_are_normalized() {
        let store = MemoryStore::new();
        seed_demo_catalog(&store).await.unwrap();

        let quizzes: Vec<_> = store
            .list_materials()
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.material_type == MaterialType::Quiz)
            .collect();
        assert!(!quizzes.is_empty());
        for quiz in quizzes {
            let data = quiz.quiz_data.expect("quiz material without questions");
            assert!(data
                .questions
                .iter()
                .all(|q| q.correct_answer < q.options.len()));
        }
    }

    #[test]
    fn test_invalid_seed_quiz_is_reported() {
        let broken = SeedMaterial::Quiz(
            "Broken Quiz",
            &[SeedQuestion {
                question: "Out of range?",
                options: &["yes", "no"],
                correct: 5,
            }],
        );
        let err = build_material(Uuid::new_v4(), &broken).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(msg) if msg.contains("Broken Quiz")));

        let notes = SeedMaterial::Pdf("Notes", "https://example.com/notes.pdf");
        let pdf = build_material(Uuid::new_v4(), &notes).unwrap();
        assert_eq!(pdf.material_type, MaterialType::Pdf);
        assert!(pdf.quiz_data.is_none());
    }
}
