use serde::{Deserialize, Serialize};

use super::GrowthSummary;
use super::growth::Growth;

/// Growth limits, all in megabytes or percentage points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Contributors whose absolute change is at or below this are hidden.
    pub significance_mb: f64,
    pub slab_cache_mb: f64,
    pub unevictable_growth_mb: f64,
    pub mlocked_growth_mb: f64,
    pub slab_growth_mb: f64,
    pub page_tables_growth_mb: f64,
    pub process_increase_percent: f64,
    pub process_min_samples: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            significance_mb: 0.1,
            slab_cache_mb: 1.0,
            unevictable_growth_mb: 50.0,
            mlocked_growth_mb: 20.0,
            slab_growth_mb: 20.0,
            page_tables_growth_mb: 10.0,
            process_increase_percent: 0.5,
            process_min_samples: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub actions: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Diagnosis {
    /// Total unevictable growth crossed its threshold.
    pub significant_growth: bool,
    pub recommendations: Vec<Recommendation>,
}

pub trait Advisor {
    fn id(&self) -> &'static str;
    fn evaluate(&self, growth: &GrowthSummary, thresholds: &Thresholds) -> Option<Recommendation>;
}

fn exceeds(growth: Option<Growth>, limit_mb: f64) -> bool {
    growth.is_some_and(|g| g.delta_mb() > limit_mb)
}

fn recommendation(id: &str, title: &str, actions: &[&str]) -> Recommendation {
    Recommendation {
        id: id.to_string(),
        title: title.to_string(),
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

pub struct MlockedAdvisor;

impl Advisor for MlockedAdvisor {
    fn id(&self) -> &'static str {
        "mlocked_growth"
    }

    fn evaluate(&self, growth: &GrowthSummary, thresholds: &Thresholds) -> Option<Recommendation> {
        exceeds(growth.mlocked, thresholds.mlocked_growth_mb).then(|| {
            recommendation(
                self.id(),
                "High mlocked memory growth detected",
                &[
                    "Check processes using mlock() system calls",
                    "Look for memory-intensive applications with real-time requirements",
                    "Consider: databases, VMs, graphics drivers",
                ],
            )
        })
    }
}

pub struct SlabAdvisor;

impl Advisor for SlabAdvisor {
    fn id(&self) -> &'static str {
        "slab_growth"
    }

    fn evaluate(&self, growth: &GrowthSummary, thresholds: &Thresholds) -> Option<Recommendation> {
        exceeds(growth.slab_unreclaimable, thresholds.slab_growth_mb).then(|| {
            recommendation(
                self.id(),
                "High unreclaimable slab growth detected",
                &[
                    "Check kernel module memory usage",
                    "Look for driver memory leaks",
                    "Consider: network drivers, filesystem caches, security modules",
                ],
            )
        })
    }
}

pub struct PageTablesAdvisor;

impl Advisor for PageTablesAdvisor {
    fn id(&self) -> &'static str {
        "page_table_growth"
    }

    fn evaluate(&self, growth: &GrowthSummary, thresholds: &Thresholds) -> Option<Recommendation> {
        exceeds(growth.page_tables, thresholds.page_tables_growth_mb).then(|| {
            recommendation(
                self.id(),
                "Page table growth detected",
                &[
                    "Check for processes with large virtual memory spaces",
                    "Look for memory fragmentation issues",
                    "Consider: large applications, many threads/processes",
                ],
            )
        })
    }
}

pub fn all_advisors() -> Vec<Box<dyn Advisor>> {
    vec![
        Box::new(MlockedAdvisor),
        Box::new(SlabAdvisor),
        Box::new(PageTablesAdvisor),
    ]
}

/// Component advisors only run once total unevictable growth is significant.
pub fn diagnose(growth: &GrowthSummary, thresholds: &Thresholds) -> Diagnosis {
    if !exceeds(growth.unevictable, thresholds.unevictable_growth_mb) {
        return Diagnosis::default();
    }
    Diagnosis {
        significant_growth: true,
        recommendations: all_advisors()
            .iter()
            .filter_map(|advisor| advisor.evaluate(growth, thresholds))
            .collect(),
    }
}

pub const FOLLOW_UP_COMMANDS: &[&str] = &[
    "cat /proc/meminfo | grep -E '(Unevictable|Mlocked|Slab)'",
    "sudo cat /proc/slabinfo | sort -k3 -n | tail -20",
    "for pid in $(pgrep -f 'suspicious_process'); do grep VmLck /proc/$pid/status; done",
    "dmesg | grep -i 'memory'",
    "sudo sysctl vm.max_map_count",
];
