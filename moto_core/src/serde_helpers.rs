// moto_core/src/serde_helpers.rs

//! `#[serde(with = ...)]` adapters so settings files can use plain arrays and degrees.

/// `[x, y, z]` arrays.
pub mod vec3_f64_from_array {
    use nalgebra::Vector3;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(vec: &Vector3<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(vec.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vector3<f64>, D::Error> {
        <[f64; 3]>::deserialize(deserializer).map(Vector3::from)
    }
}

/// `[roll, pitch, yaw]` in degrees, about x, y and z.
pub mod quat_f64_from_euler_deg {
    use nalgebra::UnitQuaternion;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(quat: &UnitQuaternion<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        let (roll, pitch, yaw) = quat.euler_angles();
        serializer.collect_seq([roll, pitch, yaw].map(f64::to_degrees))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<UnitQuaternion<f64>, D::Error> {
        let [roll, pitch, yaw] = <[f64; 3]>::deserialize(deserializer)?.map(f64::to_radians);
        Ok(UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }
}

/// Angles are stored in radians but written in degrees.
pub mod radians_from_degrees {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(angle: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(angle.to_degrees())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        f64::deserialize(deserializer).map(f64::to_radians)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra::{UnitQuaternion, Vector3};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Mount {
        #[serde(with = "super::vec3_f64_from_array")]
        offset: Vector3<f64>,
        #[serde(with = "super::quat_f64_from_euler_deg")]
        rotation: UnitQuaternion<f64>,
        #[serde(with = "super::radians_from_degrees")]
        lock: f64,
    }

    #[test]
    fn settings_read_in_degrees() {
        let mount: Mount = toml::from_str(
            "offset = [0.0, 0.85, -0.1]\nrotation = [0.0, 0.0, 90.0]\nlock = 30.0\n",
        )
        .unwrap();
        assert_eq!(mount.offset, Vector3::new(0.0, 0.85, -0.1));
        assert_abs_diff_eq!(mount.rotation * Vector3::x(), Vector3::y(), epsilon = 1e-12);
        assert_abs_diff_eq!(mount.lock, 30.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn settings_write_in_degrees() {
        let mount = Mount {
            offset: Vector3::new(1.0, 2.0, 3.0),
            rotation: UnitQuaternion::from_euler_angles(0.0, 45.0_f64.to_radians(), 0.0),
            lock: std::f64::consts::FRAC_PI_2,
        };
        let text = toml::to_string(&mount).unwrap();
        assert!(text.contains("offset = [1.0, 2.0, 3.0]"), "{}", text);
        assert!(text.contains("lock = 90.0"), "{}", text);
        let back: Mount = toml::from_str(&text).unwrap();
        assert_abs_diff_eq!(back.rotation.angle(), 45.0_f64.to_radians(), epsilon = 1e-9);
    }
}
