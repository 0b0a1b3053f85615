use crate::config::ForecastThresholds;
use crate::data_structures::{
    AggregationKey, BillingTotals, Forecast, MonthKey, MonthlySeries, PercentChange, ReportRow,
};

/// Number of trailing months considered for the next-month projection.
pub const FORECAST_WINDOW: usize = 3;

pub struct Calculator {
    thresholds: ForecastThresholds,
}

impl Calculator {
    pub fn new() -> Self {
        Self {
            thresholds: ForecastThresholds::default(),
        }
    }

    pub fn with_thresholds(thresholds: ForecastThresholds) -> Self {
        Self { thresholds }
    }

    /// Change between the last two observed months. Bases in `(0, floor]`
    /// yield an empty cell, not `N/A`.
    pub fn calculate_percent_change(&self, prev: f64, last: f64) -> PercentChange {
        if prev > self.thresholds.pct_base_floor {
            PercentChange::Value((last - prev) / prev * 100.0)
        } else if prev == 0.0 && last > 0.0 {
            PercentChange::Undefined
        } else {
            PercentChange::Empty
        }
    }

    /// Projects the month after `window`, which holds the trailing (at most
    /// three) monthly amounts in chronological order.
    pub fn forecast_next_month(&self, window: &[f64]) -> Forecast {
        let n = window.len();
        if n < 2 {
            return Forecast::none();
        }

        let min = self.thresholds.min_subtotal_for_forecast;
        let first = window[0];
        let last = window[n - 1];

        if n >= FORECAST_WINDOW && first >= min && last >= min {
            let cmgr = self.calculate_cmgr(first, last, n);
            return Forecast::new(last * (1.0 + cmgr), Some(cmgr * 100.0));
        }

        let prev = window[n - 2];

        if prev >= min && last >= min {
            self.linear_trend(prev, last)
        } else if last >= min {
            if prev > 0.0 {
                let growth = self.thresholds.conservative_growth;
                Forecast::new(last * (1.0 + growth), Some(growth * 100.0))
            } else {
                Forecast::new(last, Some(0.0))
            }
        } else if last > 0.0 && prev > 0.0 {
            self.linear_trend(prev, last)
        } else if last > 0.0 {
            Forecast::new(last, Some(0.0))
        } else {
            Forecast::none()
        }
    }

    /// Compound monthly growth rate reconciling `first` and `last` over
    /// `months` observations.
    pub fn calculate_cmgr(&self, first: f64, last: f64, months: usize) -> f64 {
        (last / first).powf(1.0 / (months as f64 - 1.0)) - 1.0
    }

    fn linear_trend(&self, prev: f64, last: f64) -> Forecast {
        let delta = last - prev;
        let projected = (last + delta).max(0.0);
        let growth = if last > 0.0 {
            Some(delta / last * 100.0)
        } else {
            None
        };

        Forecast::new(projected, growth)
    }

    pub fn build_row(
        &self,
        key: &AggregationKey,
        series: &MonthlySeries,
        months: &[MonthKey],
    ) -> ReportRow {
        let monthly_values = series.values_for(months);

        let (percent_change, forecast) = if monthly_values.len() >= 2 {
            let n = monthly_values.len();
            let window_start = n.saturating_sub(FORECAST_WINDOW);
            (
                self.calculate_percent_change(monthly_values[n - 2], monthly_values[n - 1]),
                self.forecast_next_month(&monthly_values[window_start..]),
            )
        } else {
            (PercentChange::Empty, Forecast::none())
        };

        ReportRow::new(key.clone(), monthly_values, percent_change, forecast)
    }

    /// One derived row per aggregation key, in report order.
    pub fn build_rows(&self, totals: &BillingTotals) -> Vec<ReportRow> {
        let months = totals.months();
        totals
            .rows()
            .map(|(key, series)| self.build_row(key, series, &months))
            .collect()
    }

    pub fn calculate_forecast_total(&self, rows: &[ReportRow]) -> f64 {
        rows.iter().filter_map(|row| row.forecast().value()).sum()
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}
