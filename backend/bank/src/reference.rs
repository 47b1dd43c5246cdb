//! # Reference Data
//!
//! Grades and subjects are compile-time constants. Resources point at them by
//! id (`gradeId`, `subjectId`) and nothing enforces the join: an id that does
//! not resolve simply renders as "not found".
//!
//! ## Grades
//! - Scholarship exam (grade 5), grades 6 to 9, O/L and A/L
//! - Grouped as primary, junior secondary, senior secondary and collegiate
//!
//! ## Subjects
//! - Each subject lists the grades that offer it
//! - Grouped by category (core, religion, languages, science stream, ...)
use serde::Serialize;

/// Display names in the three languages of instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Names {
    pub en: &'static str,
    pub si: &'static str,
    pub ta: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grade {
    pub id: &'static str,
    pub names: Names,
    pub group: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: &'static str,
    pub names: Names,
    pub group: &'static str,
    #[serde(skip)]
    pub grades: &'static [&'static str],
}

impl Subject {
    pub fn offered_in(&self, grade_id: &str) -> bool {
        self.grades.contains(&grade_id)
    }
}

/// Browser mini-games listed on the games page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Game {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

const fn names(en: &'static str, si: &'static str, ta: &'static str) -> Names {
    Names { en, si, ta }
}

const SECONDARY: &[&str] = &["grade-6", "grade-7", "grade-8", "grade-9", "ol"];
const ALL_SCHOOL: &[&str] = &["scholarship", "grade-6", "grade-7", "grade-8", "grade-9", "ol"];
const ADVANCED: &[&str] = &["al"];

pub const GRADES: &[Grade] = &[
    Grade {
        id: "scholarship",
        names: names("Grade 5 Scholarship", "5 ශ්‍රේණිය ශිෂ්‍යත්ව", "தரம் 5 புலமைப்பரிசில்"),
        group: "Primary",
    },
    Grade {
        id: "grade-6",
        names: names("Grade 6", "6 ශ්‍රේණිය", "தரம் 6"),
        group: "Junior Secondary",
    },
    Grade {
        id: "grade-7",
        names: names("Grade 7", "7 ශ්‍රේණිය", "தரம் 7"),
        group: "Junior Secondary",
    },
    Grade {
        id: "grade-8",
        names: names("Grade 8", "8 ශ්‍රේණිය", "தரம் 8"),
        group: "Junior Secondary",
    },
    Grade {
        id: "grade-9",
        names: names("Grade 9", "9 ශ්‍රේණිය", "தரம் 9"),
        group: "Junior Secondary",
    },
    Grade {
        id: "ol",
        names: names("G.C.E. O/L", "අ.පො.ස. සාමාන්‍ය පෙළ", "க.பொ.த சாதாரண தரம்"),
        group: "Senior Secondary",
    },
    Grade {
        id: "al",
        names: names("G.C.E. A/L", "අ.පො.ස. උසස් පෙළ", "க.பொ.த உயர் தரம்"),
        group: "Collegiate",
    },
];

pub const SUBJECTS: &[Subject] = &[
    Subject {
        id: "mathematics",
        names: names("Mathematics", "ගණිතය", "கணிதம்"),
        group: "Core",
        grades: ALL_SCHOOL,
    },
    Subject {
        id: "science",
        names: names("Science", "විද්‍යාව", "விஞ்ஞானம்"),
        group: "Core",
        grades: SECONDARY,
    },
    Subject {
        id: "environment",
        names: names("Environment Related Activities", "පරිසරය ඇසුරු ක්‍රියාකාරකම්", "சுற்றாடல் சார்ந்த செயற்பாடுகள்"),
        group: "Core",
        grades: &["scholarship"],
    },
    Subject {
        id: "history",
        names: names("History", "ඉතිහාසය", "வரலாறு"),
        group: "Core",
        grades: SECONDARY,
    },
    Subject {
        id: "geography",
        names: names("Geography", "භූගෝල විද්‍යාව", "புவியியல்"),
        group: "Humanities",
        grades: &["grade-6", "grade-7", "grade-8", "grade-9", "ol", "al"],
    },
    Subject {
        id: "health",
        names: names(
            "Health & Physical Education",
            "සෞඛ්‍ය හා ශාරීරික අධ්‍යාපනය",
            "சுகாதாரமும் உடற்கல்வியும்",
        ),
        group: "Core",
        grades: SECONDARY,
    },
    Subject {
        id: "buddhism",
        names: names("Buddhism", "බුද්ධ ධර්මය", "பௌத்தம்"),
        group: "Religion",
        grades: ALL_SCHOOL,
    },
    Subject {
        id: "hinduism",
        names: names("Hinduism", "හින්දු ධර්මය", "சைவநெறி"),
        group: "Religion",
        grades: ALL_SCHOOL,
    },
    Subject {
        id: "sinhala",
        names: names("Sinhala Language", "සිංහල භාෂාව", "சிங்கள மொழி"),
        group: "Languages",
        grades: &["scholarship", "grade-6", "grade-7", "grade-8", "grade-9", "ol", "al"],
    },
    Subject {
        id: "tamil",
        names: names("Tamil Language", "දෙමළ භාෂාව", "தமிழ் மொழி"),
        group: "Languages",
        grades: &["scholarship", "grade-6", "grade-7", "grade-8", "grade-9", "ol", "al"],
    },
    Subject {
        id: "english",
        names: names("English Language", "ඉංග්‍රීසි භාෂාව", "ஆங்கில மொழி"),
        group: "Languages",
        grades: &["scholarship", "grade-6", "grade-7", "grade-8", "grade-9", "ol", "al"],
    },
    Subject {
        id: "ict",
        names: names(
            "Information & Communication Technology",
            "තොරතුරු හා සන්නිවේදන තාක්ෂණය",
            "தகவல் தொடர்பாடல் தொழினுட்பவியல்",
        ),
        group: "Technology",
        grades: &["grade-6", "grade-7", "grade-8", "grade-9", "ol", "al"],
    },
    Subject {
        id: "commerce",
        names: names("Business & Accounting Studies", "ව්‍යාපාර හා ගිණුම්කරණ අධ්‍යයනය", "வணிகமும் கணக்கீடும்"),
        group: "Commerce",
        grades: &["ol"],
    },
    Subject {
        id: "physics",
        names: names("Physics", "භෞතික විද්‍යාව", "பௌதிகவியல்"),
        group: "Science Stream",
        grades: ADVANCED,
    },
    Subject {
        id: "chemistry",
        names: names("Chemistry", "රසායන විද්‍යාව", "இரசாயனவியல்"),
        group: "Science Stream",
        grades: ADVANCED,
    },
    Subject {
        id: "biology",
        names: names("Biology", "ජීව විද්‍යාව", "உயிரியல்"),
        group: "Science Stream",
        grades: ADVANCED,
    },
    Subject {
        id: "combined-maths",
        names: names("Combined Mathematics", "සංයුක්ත ගණිතය", "இணைந்த கணிதம்"),
        group: "Science Stream",
        grades: ADVANCED,
    },
    Subject {
        id: "accounting",
        names: names("Accounting", "ගිණුම්කරණය", "கணக்கீடு"),
        group: "Commerce Stream",
        grades: ADVANCED,
    },
    Subject {
        id: "economics",
        names: names("Economics", "ආර්ථික විද්‍යාව", "பொருளியல்"),
        group: "Commerce Stream",
        grades: ADVANCED,
    },
    Subject {
        id: "business-studies",
        names: names("Business Studies", "ව්‍යාපාර අධ්‍යයනය", "வணிகக் கல்வி"),
        group: "Commerce Stream",
        grades: ADVANCED,
    },
    Subject {
        id: "general-english",
        names: names("General English", "සාමාන්‍ය ඉංග්‍රීසි", "பொது ஆங்கிலம்"),
        group: "Common",
        grades: ADVANCED,
    },
];

pub const GAMES: &[Game] = &[
    Game {
        id: "quiz-sprint",
        title: "Quiz Sprint",
        description: "Answer as many past-paper MCQs as you can in sixty seconds.",
    },
    Game {
        id: "formula-match",
        title: "Formula Match",
        description: "Pair each formula with the quantity it computes.",
    },
    Game {
        id: "word-scramble",
        title: "Word Scramble",
        description: "Unscramble key terms from the syllabus.",
    },
    Game {
        id: "memory-cards",
        title: "Memory Cards",
        description: "Flip cards to match definitions with their terms.",
    },
];

pub fn grade(id: &str) -> Option<&'static Grade> {
    GRADES.iter().find(|g| g.id == id)
}

pub fn subject(id: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.id == id)
}

pub fn subjects_for(grade_id: &str) -> impl Iterator<Item = &'static Subject> + '_ {
    SUBJECTS.iter().filter(move |s| s.offered_in(grade_id))
}
