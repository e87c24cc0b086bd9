use serde::Serialize;

/// Compartment sizes on one day of the SEIR run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeirPoint {
    pub day: usize,
    pub susceptible: f64,
    pub exposed: f64,
    pub infected: f64,
    pub recovered: f64,
    pub deceased: f64,
}

impl SeirPoint {
    pub fn total(&self) -> f64 {
        self.susceptible + self.exposed + self.infected + self.recovered + self.deceased
    }
}

/// Resource availability and demand on one projected day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourcePoint {
    pub day: usize,
    pub active_cases: f64,
    pub available_beds: f64,
    pub required_beds: f64,
    pub available_icu: f64,
    pub required_icu: f64,
    pub available_ventilators: f64,
    pub required_ventilators: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfectionSeries {
    pub points: Vec<SeirPoint>,
}

impl InfectionSeries {
    pub fn new(len: usize) -> InfectionSeries {
        InfectionSeries {
            points: (0..len)
                .map(|day| SeirPoint {
                    day,
                    ..Default::default()
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSeries {
    pub points: Vec<ResourcePoint>,
}

impl ResourceSeries {
    pub fn new(len: usize) -> ResourceSeries {
        ResourceSeries {
            points: (0..len)
                .map(|day| ResourcePoint {
                    day,
                    ..Default::default()
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
