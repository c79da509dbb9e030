use crate::process::FrameProcessor;
use crate::reassemble;
use crate::types::Size;

const NOT_EDGE: u8 = 0;
const WEAK: u8 = 1;
const STRONG: u8 = 2;

#[derive(Clone, Copy)]
enum Direction {
    Horizontal,
    Vertical,
    Diagonal,
    AntiDiagonal,
}

/// Canny edge detection with fixed low/high thresholds on the L1 gradient.
///
/// Reads the luma plane of the NV21 input and writes 255 on edges, 0 elsewhere.
pub struct CannyEdges {
    low: u16,
    high: u16,
    size: Size,
    magnitude: Vec<u16>,
    direction: Vec<Direction>,
    state: Vec<u8>,
    stack: Vec<usize>,
}

impl CannyEdges {
    pub fn new(low: u16, high: u16) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        CannyEdges {
            low,
            high,
            size: Size::default(),
            magnitude: Vec::new(),
            direction: Vec::new(),
            state: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn thresholds(&self) -> (u16, u16) {
        (self.low, self.high)
    }

    fn ensure_size(&mut self, size: Size) {
        if self.size != size {
            let n = size.pixel_count();
            self.magnitude = vec![0; n];
            self.direction = vec![Direction::Horizontal; n];
            self.state = vec![0; n];
            self.stack.clear();
            self.size = size;
            tracing::debug!(width = size.width, height = size.height, "edge scratch resized");
        }
    }

    fn gradients(&mut self, luma: &[u8], w: usize, h: usize) {
        let px = |x: isize, y: isize| -> i32 {
            let x = x.clamp(0, w as isize - 1) as usize;
            let y = y.clamp(0, h as isize - 1) as usize;
            luma[y * w + x] as i32
        };
        for y in 0..h as isize {
            for x in 0..w as isize {
                let gx = px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1)
                    - px(x - 1, y - 1)
                    - 2 * px(x - 1, y)
                    - px(x - 1, y + 1);
                let gy = px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1)
                    - px(x - 1, y - 1)
                    - 2 * px(x, y - 1)
                    - px(x + 1, y - 1);
                let (ax, ay) = (gx.abs(), gy.abs());
                let i = y as usize * w + x as usize;
                self.magnitude[i] = (ax + ay) as u16;
                // tan(22.5°) ≈ 0.4142, tan(67.5°) ≈ 2.4142
                let dir = if ay * 10_000 <= ax * 4_142 {
                    Direction::Horizontal
                } else if ay * 10_000 >= ax * 24_142 {
                    Direction::Vertical
                } else if (gx < 0) == (gy < 0) {
                    Direction::Diagonal
                } else {
                    Direction::AntiDiagonal
                };
                self.direction[i] = dir;
            }
        }
    }

    fn suppress(&mut self, w: usize, h: usize) {
        let mag = |x: isize, y: isize| -> u16 {
            if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
                0
            } else {
                self.magnitude[y as usize * w + x as usize]
            }
        };
        self.stack.clear();
        for y in 0..h as isize {
            for x in 0..w as isize {
                let i = y as usize * w + x as usize;
                let m = self.magnitude[i];
                if m <= self.low {
                    self.state[i] = NOT_EDGE;
                    continue;
                }
                let (before, after) = match self.direction[i] {
                    Direction::Horizontal => (mag(x - 1, y), mag(x + 1, y)),
                    Direction::Vertical => (mag(x, y - 1), mag(x, y + 1)),
                    Direction::Diagonal => (mag(x - 1, y - 1), mag(x + 1, y + 1)),
                    Direction::AntiDiagonal => (mag(x + 1, y - 1), mag(x - 1, y + 1)),
                };
                self.state[i] = if m > before && m >= after {
                    if m > self.high {
                        self.stack.push(i);
                        STRONG
                    } else {
                        WEAK
                    }
                } else {
                    NOT_EDGE
                };
            }
        }
    }

    fn hysteresis(&mut self, w: usize, h: usize) {
        while let Some(i) = self.stack.pop() {
            let (x, y) = ((i % w) as isize, (i / w) as isize);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                        continue;
                    }
                    let j = ny as usize * w + nx as usize;
                    if self.state[j] == WEAK {
                        self.state[j] = STRONG;
                        self.stack.push(j);
                    }
                }
            }
        }
    }
}

impl Default for CannyEdges {
    fn default() -> Self {
        CannyEdges::new(80, 150)
    }
}

impl FrameProcessor for CannyEdges {
    fn process(&mut self, input: &[u8], size: Size, output: &mut [u8]) {
        let Some(luma) = reassemble::luma(input, size) else {
            tracing::warn!(input_len = input.len(), ?size, "edge input shorter than luma plane");
            output.fill(0);
            return;
        };
        if size.is_empty() || output.len() != size.pixel_count() {
            output.fill(0);
            return;
        }

        let (w, h) = (size.width as usize, size.height as usize);
        self.ensure_size(size);
        self.gradients(luma, w, h);
        self.suppress(w, h);
        self.hysteresis(w, h);

        for (out, state) in output.iter_mut().zip(&self.state) {
            *out = if *state == STRONG { 255 } else { 0 };
        }
    }

    fn name(&self) -> &str {
        "canny"
    }
}
