pub trait FromCoordinates <T> {
    /// Creates a new instance of the struct from the given coordinates.
    /// # Arguments
    /// * `position` - The coordinates to create the struct from.
    /// # Returns
    /// A new instance of the struct.
    /// # Example
    /// ```
    /// use rs_nbody::models::{FromCoordinates, Vector3};
    ///
    /// let v = Vector3::from_coord((1.0, 2.0, 3.0));
    /// assert_eq!(v.x, 1.0);
    /// assert_eq!(v.z, 3.0);
    /// ```
    fn from_coord(position: T) -> Self;
}

pub trait ToCoordinates <T> {
    /// Converts the struct to a tuple of coordinates.
    /// # Returns
    /// A tuple of coordinates.
    /// # Example
    /// ```
    /// use rs_nbody::models::{ToCoordinates, Vector3};
    ///
    /// let v = Vector3::new(1.0, 2.0, 3.0);
    /// assert_eq!(v.to_coord(), (1.0, 2.0, 3.0));
    /// ```
    fn to_coord(&self) -> T;
}

/// Packs a slice of vectors into a flat `[x0, y0, z0, x1, ...]` buffer.
pub fn flatten_coordinates<V: ToCoordinates<(f64, f64, f64)>>(items: &[V]) -> Vec<f64> {
    let mut flat = Vec::with_capacity(items.len() * 3);
    for item in items {
        let (x, y, z) = item.to_coord();
        flat.extend_from_slice(&[x, y, z]);
    }
    flat
}

/// Unpacks a flat `[x0, y0, z0, x1, ...]` buffer. Returns `None` if the length is not a multiple of 3.
pub fn unflatten_coordinates<V: FromCoordinates<(f64, f64, f64)>>(flat: &[f64]) -> Option<Vec<V>> {
    if flat.len() % 3 != 0 {
        return None;
    }
    Some(
        flat.chunks_exact(3)
            .map(|c| V::from_coord((c[0], c[1], c[2])))
            .collect()
    )
}
