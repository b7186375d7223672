use serde::{Deserialize, Serialize};

use crate::models::volatility::{VolSide, VolSurface};

/// Display-ready surface: one grid with gaps filled, plus its axes
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SurfaceUpdate {
    pub side: VolSide,
    pub strikes: Vec<f64>,
    pub maturities: Vec<i64>,
    pub labels: Vec<String>,
    /// `sigma[strike][maturity]`, `null` where nothing could be filled
    pub sigma: Vec<Vec<Option<f64>>>,
}

impl SurfaceUpdate {
    pub fn from_surface(surface: &VolSurface, side: VolSide) -> Self {
        let sigma = surface
            .filled(side)
            .outer_iter()
            .map(|row| row.to_vec())
            .collect();

        Self {
            side,
            strikes: surface.strikes.clone(),
            maturities: surface.maturities.clone(),
            labels: surface.maturity_labels.clone(),
            sigma,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VolPoint;

    #[test]
    fn fills_gaps_and_serializes() {
        let surface = VolSurface::from_points(vec![
            VolPoint {
                strike: 70.0,
                days_to_expiry: 10,
                expiration: "a".to_string(),
                call_mid_iv: Some(20.0),
                put_mid_iv: None,
                mid_iv: 20.0,
            },
            VolPoint {
                strike: 80.0,
                days_to_expiry: 30,
                expiration: "b".to_string(),
                call_mid_iv: Some(30.0),
                put_mid_iv: None,
                mid_iv: 30.0,
            },
        ]);
        let update = SurfaceUpdate::from_surface(&surface, VolSide::Mid);
        assert_eq!(update.sigma.len(), 2);
        assert!(update.sigma.iter().flatten().all(Option::is_some));
        assert_eq!(update.labels, vec!["a", "b"]);

        let put = SurfaceUpdate::from_surface(&surface, VolSide::Put);
        let json = serde_json::to_string(&put).unwrap();
        assert!(json.contains("[[null,null],[null,null]]"));
        let back: SurfaceUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, put);
    }
}
