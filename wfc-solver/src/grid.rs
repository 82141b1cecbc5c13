use nalgebra::Vector3;

/// Dense 3D array, x-fastest (`z * width * height + y * width + x`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub(crate) data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    /// Creates a new grid with the given dimensions, initialized with default values.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self::filled(width, height, depth, T::default())
    }

    /// Resets every element to its default value.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }
}

impl<T: Clone> Grid<T> {
    /// Creates a grid with every element set to `value`.
    pub fn filled(width: usize, height: usize, depth: usize, value: T) -> Self {
        Self {
            width,
            height,
            depth,
            data: vec![value; width * height * depth],
        }
    }
}

impl<T> Grid<T> {
    /// Wraps existing data. Returns `None` when the length does not match the dimensions.
    pub fn from_vec(width: usize, height: usize, depth: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == width * height * depth).then_some(Self {
            width,
            height,
            depth,
            data,
        })
    }

    /// Returns an immutable reference to the element at the given coordinates,
    /// or None if the coordinates are out of bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        self.index(x, y, z).and_then(|idx| self.data.get(idx))
    }

    /// Returns a mutable reference to the element at the given coordinates,
    /// or None if the coordinates are out of bounds.
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> Option<&mut T> {
        self.index(x, y, z)
            .and_then(move |idx| self.data.get_mut(idx))
    }

    /// Element at a signed local position, `None` outside the grid.
    pub fn get_local(&self, local: Vector3<i32>) -> Option<&T> {
        let [x, y, z] = self.checked_coords(local)?;
        self.get(x, y, z)
    }

    /// Mutable element at a signed local position, `None` outside the grid.
    pub fn get_local_mut(&mut self, local: Vector3<i32>) -> Option<&mut T> {
        let [x, y, z] = self.checked_coords(local)?;
        self.get_mut(x, y, z)
    }

    fn checked_coords(&self, local: Vector3<i32>) -> Option<[usize; 3]> {
        let x = usize::try_from(local.x).ok()?;
        let y = usize::try_from(local.y).ok()?;
        let z = usize::try_from(local.z).ok()?;
        Some([x, y, z])
    }

    /// Calculates the 1D index for the given 3D coordinates.
    /// Returns None if the coordinates are out of bounds.
    pub fn index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        if x < self.width && y < self.height && z < self.depth {
            Some(z * self.width * self.height + y * self.width + x)
        } else {
            None
        }
    }

    /// Inverse of [`Grid::index`].
    pub fn coords(&self, index: usize) -> (usize, usize, usize) {
        let plane = self.width * self.height;
        (index % self.width, (index / self.width) % self.height, index / plane)
    }

    /// `[width, height, depth]`.
    pub fn dimensions(&self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
