// libs/scheduling-cell/src/services/schedule.rs
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::models::Service;

/// One service of a booking mapped onto the professional's timeline.
#[derive(Debug, Clone)]
pub struct ServiceWindow {
    pub service: Service,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// The full plan for a multi-service booking: back-to-back windows in request
/// order plus the aggregate duration and cost.
#[derive(Debug, Clone)]
pub struct ServicePlan {
    pub windows: Vec<ServiceWindow>,
    pub total_duration_minutes: i64,
    pub total_price: Decimal,
}

impl ServicePlan {
    pub fn window_start(&self) -> Option<DateTime<Utc>> {
        self.windows.first().map(|w| w.starts_at)
    }

    pub fn window_end(&self) -> Option<DateTime<Utc>> {
        self.windows.last().map(|w| w.ends_at)
    }
}

/// Chain the resolved services from `starts_at`: each window begins exactly
/// where the previous one ends. Assumes the caller already resolved every
/// service record.
pub fn compute_windows(starts_at: DateTime<Utc>, services: &[Service]) -> ServicePlan {
    let mut windows = Vec::with_capacity(services.len());
    let mut cursor = starts_at;
    let mut total_duration_minutes = 0i64;
    let mut total_price = Decimal::ZERO;

    for service in services {
        let duration = Duration::minutes(service.duration_minutes as i64);
        let ends_at = cursor + duration;

        total_duration_minutes += service.duration_minutes as i64;
        total_price += service.price;

        windows.push(ServiceWindow {
            service: service.clone(),
            starts_at: cursor,
            ends_at,
        });

        cursor = ends_at;
    }

    ServicePlan {
        windows,
        total_duration_minutes,
        total_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn service(name: &str, duration_minutes: i32, price: Decimal) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            duration_minutes,
        }
    }

    #[test]
    fn windows_chain_without_gaps_or_overlap() {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap();
        let services = vec![
            service("corte tesoura", 60, dec!(50.00)),
            service("barba", 30, dec!(20.00)),
            service("sobrancelha", 10, dec!(10.00)),
        ];

        let plan = compute_windows(start, &services);

        assert_eq!(plan.windows.len(), 3);
        for pair in plan.windows.windows(2) {
            assert_eq!(pair[0].ends_at, pair[1].starts_at);
        }
        assert_eq!(plan.window_start(), Some(start));
        assert_eq!(
            plan.window_end(),
            Some(start + Duration::minutes(100))
        );
    }

    #[test]
    fn totals_are_the_sums_of_durations_and_prices() {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap();
        let services = vec![
            service("corte tesoura", 60, dec!(50.00)),
            service("barba", 30, dec!(20.00)),
        ];

        let plan = compute_windows(start, &services);

        assert_eq!(plan.total_duration_minutes, 90);
        assert_eq!(plan.total_price, dec!(70.00));
    }

    #[test]
    fn empty_service_list_yields_an_empty_plan() {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap();

        let plan = compute_windows(start, &[]);

        assert!(plan.windows.is_empty());
        assert_eq!(plan.total_duration_minutes, 0);
        assert_eq!(plan.total_price, Decimal::ZERO);
        assert_eq!(plan.window_start(), None);
    }
}
